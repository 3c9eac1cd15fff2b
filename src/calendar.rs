// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Calendar views over the wardrobe.
//!
//! Items are placed on the day they were created (UTC). Weeks start on
//! Sunday.

use crate::index::WardrobeItem;

use chrono::{DateTime, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Day an item was created, or `None` for an out-of-range timestamp.
pub fn created_on(item: &WardrobeItem) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(item.created_at).map(|time| time.date_naive())
}

/// Group items by creation day, newest day first.
///
/// Items keep their relative order inside each day.
pub fn group_by_day(items: &[WardrobeItem]) -> Vec<(NaiveDate, Vec<&WardrobeItem>)> {
    let mut days: BTreeMap<NaiveDate, Vec<&WardrobeItem>> = BTreeMap::new();
    for item in items {
        if let Some(day) = created_on(item) {
            days.entry(day).or_default().push(item);
        }
    }

    days.into_iter().rev().collect()
}

/// Items created on target day.
pub fn items_on(items: &[WardrobeItem], day: NaiveDate) -> Vec<&WardrobeItem> {
    items
        .iter()
        .filter(|item| created_on(item) == Some(day))
        .collect()
}

/// The seven days of the week containing target day.
///
/// Empty if part of that week falls outside the representable date range.
pub fn week_of(day: NaiveDate) -> Vec<NaiveDate> {
    let week = day.week(Weekday::Sun);
    match (week.checked_first_day(), week.checked_last_day()) {
        (Some(first), Some(_)) => first.iter_days().take(7).collect(),
        _ => Vec::new(),
    }
}
