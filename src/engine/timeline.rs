/*!
 * Timeline Builder
 *
 * Deterministically reconstructs the day's unified timeline from a snapshot
 * of active appointments. Pure and synchronous — the output depends only on
 * the input snapshot and policy constants, never on the wall clock.
 */

use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::models::{Appointment, AppointmentKind, Priority};
use crate::time_math;

/// The kind of a timeline block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Scheduled,
    Queue,
    Lunch,
    Gap,
}

/// One segment of the day's unified timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub start_minute: u16,
    pub end_minute: u16,
    /// The underlying appointment id, for `Scheduled`/`Queue` blocks.
    pub appointment_id: Option<Uuid>,
}

impl Block {
    pub fn duration(&self) -> u16 {
        self.end_minute - self.start_minute
    }
}

/// Builds the ordered sequence of blocks for one `(barber, date)` timeline.
///
/// `snapshot` must already be filtered to active statuses
/// (`pending | confirmed | ongoing`); this function does not filter by status.
pub fn build_timeline(snapshot: &[Appointment], policy: &PolicyConfig) -> Vec<Block> {
    let mut scheduled: Vec<&Appointment> = snapshot
        .iter()
        .filter(|a| a.appointment_kind == AppointmentKind::Scheduled)
        .collect();
    scheduled.sort_by_key(|a| a.start_minute().unwrap_or(u16::MAX));

    let mut queue: Vec<&Appointment> = snapshot
        .iter()
        .filter(|a| a.appointment_kind == AppointmentKind::Queue)
        .collect();
    queue.sort_by_key(|a| (a.priority.rank(), a.queue_position.unwrap_or(i32::MAX)));

    let mut blocks = Vec::new();
    blocks.push(Block {
        kind: BlockKind::Lunch,
        start_minute: policy.lunch_start,
        end_minute: policy.lunch_end,
        appointment_id: None,
    });

    let mut cursor = policy.working_start;
    let mut queue_iter = queue.into_iter().peekable();

    for appt in scheduled {
        let start = appt.start_minute().expect("scheduled row has a start time");
        let end = start + appt.total_duration_min as u16;

        if cursor < start {
            cursor = fill_gap(&mut blocks, cursor, start, &mut queue_iter, policy);
        }
        if cursor >= policy.lunch_start && cursor < policy.lunch_end {
            cursor = policy.lunch_end;
        }

        blocks.push(Block {
            kind: BlockKind::Scheduled,
            start_minute: start,
            end_minute: end,
            appointment_id: Some(appt.id),
        });
        cursor = cursor.max(end);
    }

    if cursor >= policy.lunch_start && cursor < policy.lunch_end {
        cursor = policy.lunch_end;
    }
    for appt in queue_iter {
        if cursor >= policy.working_end {
            break;
        }
        let duration = appt.total_duration_min as u16;
        if cursor >= policy.lunch_start && cursor < policy.lunch_end {
            cursor = policy.lunch_end;
        }
        let end = cursor + duration;
        blocks.push(Block {
            kind: BlockKind::Queue,
            start_minute: cursor,
            end_minute: end,
            appointment_id: Some(appt.id),
        });
        cursor = end;
    }

    push_gap(&mut blocks, cursor, policy.working_end, policy);

    blocks.sort_by_key(|b| b.start_minute);
    blocks
}

/// Pushes a `[start, end)` gap, splitting it around the fixed lunch block
/// when the range would otherwise overlap it. `start` landing inside lunch
/// is clamped to `lunch_end` first.
fn push_gap(blocks: &mut Vec<Block>, mut start: u16, end: u16, policy: &PolicyConfig) {
    if start >= policy.lunch_start && start < policy.lunch_end {
        start = policy.lunch_end;
    }
    if start >= end {
        return;
    }
    if start < policy.lunch_start && end > policy.lunch_start {
        if start < policy.lunch_start {
            blocks.push(Block {
                kind: BlockKind::Gap,
                start_minute: start,
                end_minute: policy.lunch_start,
                appointment_id: None,
            });
        }
        if policy.lunch_end < end {
            blocks.push(Block {
                kind: BlockKind::Gap,
                start_minute: policy.lunch_end,
                end_minute: end,
                appointment_id: None,
            });
        }
    } else {
        blocks.push(Block {
            kind: BlockKind::Gap,
            start_minute: start,
            end_minute: end,
            appointment_id: None,
        });
    }
}

/// Greedily fills `[cursor, gap_end)` with queue appointments (in priority
/// order) that fit entirely within the remaining gap and don't cross lunch.
/// Returns the cursor position after filling — any unfilled remainder
/// becomes a `Gap` block.
fn fill_gap<'a, I>(
    blocks: &mut Vec<Block>,
    mut cursor: u16,
    gap_end: u16,
    queue_iter: &mut std::iter::Peekable<I>,
    policy: &PolicyConfig,
) -> u16
where
    I: Iterator<Item = &'a Appointment>,
{
    let gap_start = cursor;
    let mut filled_any = false;

    loop {
        if cursor >= policy.lunch_start && cursor < policy.lunch_end {
            cursor = policy.lunch_end;
        }
        if cursor >= gap_end {
            break;
        }
        let Some(next) = queue_iter.peek() else { break };
        let duration = next.total_duration_min as u16;
        let end = cursor + duration;
        if end > gap_end || time_math::crosses_lunch(cursor, duration, policy.lunch_start, policy.lunch_end) {
            break;
        }
        let appt = queue_iter.next().unwrap();
        blocks.push(Block {
            kind: BlockKind::Queue,
            start_minute: cursor,
            end_minute: end,
            appointment_id: Some(appt.id),
        });
        cursor = end;
        filled_any = true;
    }

    if filled_any && cursor < gap_end {
        push_gap(blocks, cursor, gap_end, policy);
        cursor = gap_end;
    } else if !filled_any {
        push_gap(blocks, gap_start, gap_end, policy);
        cursor = gap_end;
    }
    cursor
}

/// Re-derives queue order the way `change_priority` requires: stable sort by
/// `(priority_rank asc, created_at asc)`.
pub fn reorder_queue_by_priority(appointments: &[Appointment]) -> Vec<Uuid> {
    let mut rows: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.appointment_kind == AppointmentKind::Queue)
        .collect();
    rows.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(a.created_at.cmp(&b.created_at))
    });
    rows.into_iter().map(|a| a.id).collect()
}

/// Rank used purely for readability at call sites that sort by priority
/// outside of an `Appointment` context (e.g. composing a new row before insert).
pub fn priority_rank(priority: Priority) -> u8 {
    priority.rank()
}
