//! Weekly availability editor.
//!
//! A week is a set of one-hour slots keyed by `(day, hour)`, where day 0 is
//! Sunday. Slots serialize as `{ day, start: "HH:00", end: "HH:00" }`; the
//! last hour of a day ends at `"24:00"`.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::i18n::{Locale, Message};

pub const DAYS_PER_WEEK: u8 = 7;
pub const HOURS_PER_DAY: u8 = 24;

/// 8 AM through the slot starting at 5 PM.
pub const DAYTIME_HOURS: RangeInclusive<u8> = 8..=17;

/// Days in display order, Monday first.
pub const DISPLAY_ORDER: [u8; 7] = [1, 2, 3, 4, 5, 6, 0];

/// One bookable hour on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day: u8,
    pub start: String,
    pub end: String,
}

impl AvailabilitySlot {
    pub fn new(day: u8, hour: u8) -> Result<Self, ValidationError> {
        check(day, hour)?;
        Ok(Self {
            day,
            start: format!("{hour:02}:00"),
            end: format!("{:02}:00", hour + 1),
        })
    }

    /// Start hour, if `start` is a whole `HH:00` hour in range.
    pub fn hour(&self) -> Option<u8> {
        let (h, m) = self.start.split_once(':')?;
        let hour: u8 = h.parse().ok()?;
        (m == "00" && hour < HOURS_PER_DAY).then_some(hour)
    }
}

fn check(day: u8, hour: u8) -> Result<(), ValidationError> {
    if day >= DAYS_PER_WEEK || hour >= HOURS_PER_DAY {
        return Err(ValidationError::InvalidSlot { day, hour });
    }
    Ok(())
}

/// `"8:00 AM"`, `"12:00 PM"`, `"11:00 PM"`.
pub fn format_hour_label(hour: u8) -> String {
    match hour {
        0 => "12:00 AM".to_string(),
        1..=11 => format!("{hour}:00 AM"),
        12 => "12:00 PM".to_string(),
        _ => format!("{}:00 PM", hour - 12),
    }
}

/// Editable weekly availability.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityEditor {
    slots: BTreeSet<(u8, u8)>,
    mounted: bool,
}

impl AvailabilityEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from saved slots. Malformed entries are dropped.
    pub fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = AvailabilitySlot>,
    {
        let slots = slots
            .into_iter()
            .filter_map(|s| {
                let hour = s.hour()?;
                check(s.day, hour).ok().map(|_| (s.day, hour))
            })
            .collect();
        Self {
            slots,
            mounted: false,
        }
    }

    /// First display of the editor: an empty week is filled with daytime
    /// hours on every day. Only the first call can seed.
    pub fn on_mount(&mut self) -> bool {
        let first = !self.mounted;
        self.mounted = true;
        if first && self.slots.is_empty() {
            for day in 0..DAYS_PER_WEEK {
                self.fill(day, DAYTIME_HOURS);
            }
            return true;
        }
        false
    }

    pub fn toggle_slot(&mut self, day: u8, hour: u8) -> Result<bool, ValidationError> {
        check(day, hour)?;
        if self.slots.remove(&(day, hour)) {
            Ok(false)
        } else {
            self.slots.insert((day, hour));
            Ok(true)
        }
    }

    pub fn select_all_day(&mut self, day: u8) -> Result<(), ValidationError> {
        check(day, 0)?;
        self.fill(day, 0..=HOURS_PER_DAY - 1);
        Ok(())
    }

    pub fn clear_day(&mut self, day: u8) -> Result<(), ValidationError> {
        check(day, 0)?;
        self.slots.retain(|(d, _)| *d != day);
        Ok(())
    }

    pub fn select_daytime_hours(&mut self, day: u8) -> Result<(), ValidationError> {
        check(day, 0)?;
        self.fill(day, DAYTIME_HOURS);
        Ok(())
    }

    /// Replace one day's slots with `hours`.
    fn fill(&mut self, day: u8, hours: RangeInclusive<u8>) {
        self.slots.retain(|(d, _)| *d != day);
        self.slots.extend(hours.map(|h| (day, h)));
    }

    pub fn has_slot(&self, day: u8, hour: u8) -> bool {
        self.slots.contains(&(day, hour))
    }

    pub fn count_for_day(&self, day: u8) -> usize {
        self.slots.range((day, 0)..=(day, HOURS_PER_DAY - 1)).count()
    }

    pub fn count_for_week(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn day_summary(&self, day: u8, locale: Locale) -> String {
        Message::HoursSelectedDay {
            count: self.count_for_day(day),
        }
        .render(locale)
    }

    pub fn week_summary(&self, locale: Locale) -> String {
        Message::HoursSelectedWeek {
            total: self.count_for_week(),
        }
        .render(locale)
    }

    /// Slots sorted by `(day, start)`.
    pub fn slots(&self) -> Vec<AvailabilitySlot> {
        self.slots
            .iter()
            .map(|&(day, hour)| AvailabilitySlot {
                day,
                start: format!("{hour:02}:00"),
                end: format!("{:02}:00", hour + 1),
            })
            .collect()
    }

    pub fn into_slots(self) -> Vec<AvailabilitySlot> {
        self.slots()
    }
}
