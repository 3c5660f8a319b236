//! Poll domain types and the pure filter/sort engine applied to poll lists.

use crate::error::{Error, Result};
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type PollId = u64;

/// A 20-byte wallet address, rendered as lowercase `0x` hex.
///
/// Equality is byte equality, so every address comparison is
/// case-insensitive by construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if !hex.is_ascii() || hex.len() != 40 {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
                .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        }
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// One poll as composed from the contract reads, per requesting wallet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: PollId,
    pub title: String,
    pub creator: Address,
    pub ended: bool,
    /// Unix timestamp at which voting closes.
    pub end_time: i64,
    pub total_votes: u64,
    pub option_names: Vec<String>,
    /// Tallies, parallel to `option_names`.
    pub option_votes: Vec<u64>,
    pub has_voted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortBy {
    /// Higher id = more recently created, ids are assigned sequentially.
    Newest,
    MostVotes,
    EndingSoon,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "newest" => Ok(SortBy::Newest),
            "most-votes" => Ok(SortBy::MostVotes),
            "ending-soon" => Ok(SortBy::EndingSoon),
            other => Err(Error::UnknownSortKey(other.to_string())),
        }
    }
}

/// Ephemeral per-view filter state, reset on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct PollFilters {
    pub active: bool,
    pub ended: bool,
    pub my_polls: bool,
    pub voted: bool,
    pub sort_by: SortBy,
    pub search: String,
}

impl Default for PollFilters {
    fn default() -> Self {
        PollFilters {
            active: true,
            ended: false,
            my_polls: false,
            voted: false,
            sort_by: SortBy::Newest,
            search: String::new(),
        }
    }
}

impl PollFilters {
    pub fn clear(&mut self) {
        *self = PollFilters::default();
    }

    /// Number of non-default filter members. The default `active` flag
    /// counts, so a freshly reset filter reports 1.
    pub fn active_filter_count(&self) -> usize {
        let mut count = 0;
        for flag in &[self.active, self.ended, self.my_polls, self.voted] {
            if *flag {
                count += 1;
            }
        }
        if self.sort_by != SortBy::Newest {
            count += 1;
        }
        if !self.search.is_empty() {
            count += 1;
        }
        count
    }

    /// Human label for the current filter combination.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.active && !self.ended {
            parts.push("Active".to_string());
        }
        if self.ended && !self.active {
            parts.push("Ended".to_string());
        }
        if self.active && self.ended {
            parts.push("All Status".to_string());
        }
        if self.my_polls {
            parts.push("My Polls".to_string());
        }
        if self.voted {
            parts.push("Voted".to_string());
        }
        if !self.search.is_empty() {
            parts.push(format!("\"{}\"", self.search));
        }
        if parts.is_empty() {
            "All Polls".to_string()
        } else {
            parts.join(" • ")
        }
    }

    /// First matching clause wins. The flags are OR-ed, not AND-ed, and the
    /// fallback clause only fires when none of ended/my-polls/voted/search is
    /// set; `active` deliberately does not count as a specific filter there.
    pub fn matches(&self, poll: &PollSummary, wallet: Option<Address>) -> bool {
        if self.active && !poll.ended {
            return true;
        }
        if self.ended && poll.ended {
            return true;
        }
        if self.my_polls {
            if let Some(wallet) = wallet {
                if poll.creator == wallet {
                    return true;
                }
            }
        }
        if self.voted && poll.has_voted {
            return true;
        }
        if !self.search.is_empty() {
            let query = self.search.to_lowercase();
            return poll.title.to_lowercase().contains(&query)
                || poll.id.to_string().contains(&query);
        }
        let has_specific_filters = self.ended || self.my_polls || self.voted;
        !has_specific_filters && !poll.ended
    }
}

pub fn filter_polls(
    polls: &[PollSummary],
    filters: &PollFilters,
    wallet: Option<Address>,
) -> Vec<PollSummary> {
    polls
        .iter()
        .filter(|poll| filters.matches(poll, wallet))
        .cloned()
        .collect()
}

/// Stable sort, so equal keys keep their input order.
pub fn sort_polls(mut polls: Vec<PollSummary>, sort_by: SortBy) -> Vec<PollSummary> {
    match sort_by {
        SortBy::Newest => polls.sort_by(|a, b| b.id.cmp(&a.id)),
        SortBy::MostVotes => polls.sort_by(|a, b| b.total_votes.cmp(&a.total_votes)),
        SortBy::EndingSoon => polls.sort_by(|a, b| match (a.ended, b.ended) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            // more recently ended first
            (true, true) => b.end_time.cmp(&a.end_time),
            // soonest to end first
            (false, false) => a.end_time.cmp(&b.end_time),
        }),
    }
    polls
}

pub fn filter_and_sort(
    polls: &[PollSummary],
    filters: &PollFilters,
    wallet: Option<Address>,
) -> Vec<PollSummary> {
    sort_polls(filter_polls(polls, filters, wallet), filters.sort_by)
}

const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = 86400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStatus {
    Active,
    /// Less than a day left.
    EndingToday,
    /// Less than an hour left.
    EndingSoon,
    Ended,
}

pub fn poll_status(poll: &PollSummary, now: i64) -> PollStatus {
    if poll.ended {
        return PollStatus::Ended;
    }
    let time_left = poll.end_time - now;
    if time_left < HOUR_SECS {
        PollStatus::EndingSoon
    } else if time_left < DAY_SECS {
        PollStatus::EndingToday
    } else {
        PollStatus::Active
    }
}

pub fn is_ending_soon(end_time: i64, now: i64) -> bool {
    let time_left = end_time - now;
    time_left > 0 && time_left < DAY_SECS
}

/// Short countdown text: "2d 4h", "3h 12m", "45m" or "Ended".
pub fn time_remaining(end_time: i64, now: i64) -> String {
    let time_left = end_time - now;
    if time_left <= 0 {
        return "Ended".to_string();
    }
    let days = time_left / DAY_SECS;
    let hours = (time_left % DAY_SECS) / HOUR_SECS;
    let minutes = (time_left % HOUR_SECS) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Aggregate counters over a poll list, as shown on the dashboard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PollSetStats {
    pub total: usize,
    pub active: usize,
    pub ended: usize,
    pub mine: usize,
    pub voted: usize,
    pub total_votes: u64,
    pub average_votes: f64,
}

pub fn poll_set_stats(polls: &[PollSummary], wallet: Option<Address>) -> PollSetStats {
    let mut stats = PollSetStats::default();
    stats.total = polls.len();
    for poll in polls {
        if poll.ended {
            stats.ended += 1;
        } else {
            stats.active += 1;
        }
        if wallet.map_or(false, |w| poll.creator == w) {
            stats.mine += 1;
        }
        if poll.has_voted {
            stats.voted += 1;
        }
        stats.total_votes += poll.total_votes;
    }
    if stats.total > 0 {
        stats.average_votes = stats.total_votes as f64 / stats.total as f64;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: u8) -> Address {
        Address::from_bytes([tag; 20])
    }

    fn poll(id: PollId, ended: bool) -> PollSummary {
        PollSummary {
            id,
            title: format!("Poll {}", id),
            creator: addr(1),
            ended,
            end_time: 1_000 + id as i64,
            total_votes: 0,
            option_names: vec!["yes".to_string(), "no".to_string()],
            option_votes: vec![0, 0],
            has_voted: false,
        }
    }

    fn sample() -> Vec<PollSummary> {
        let mut polls = vec![poll(0, false), poll(1, true), poll(2, false), poll(3, true)];
        polls[1].creator = addr(2);
        polls[2].has_voted = true;
        polls
    }

    fn only(flag: &str) -> PollFilters {
        let mut f = PollFilters {
            active: false,
            ..PollFilters::default()
        };
        match flag {
            "active" => f.active = true,
            "ended" => f.ended = true,
            "my_polls" => f.my_polls = true,
            "voted" => f.voted = true,
            _ => unreachable!(),
        }
        f
    }

    #[test]
    fn address_round_trips_and_ignores_case() {
        let parsed: Address = "0x00FFaa0000000000000000000000000000000012"
            .parse()
            .unwrap();
        assert_eq!(
            parsed.to_string(),
            "0x00ffaa0000000000000000000000000000000012"
        );
        let reparsed: Address = parsed.to_string().parse().unwrap();
        assert_eq!(parsed, reparsed);
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz".repeat(20).parse::<Address>().is_err());
    }

    #[test]
    fn single_flag_filters_match_exactly() {
        let polls = sample();
        let ids = |f: &PollFilters| -> Vec<PollId> {
            filter_polls(&polls, f, Some(addr(2)))
                .iter()
                .map(|p| p.id)
                .collect()
        };
        assert_eq!(ids(&only("active")), vec![0, 2]);
        assert_eq!(ids(&only("ended")), vec![1, 3]);
        assert_eq!(ids(&only("my_polls")), vec![1]);
        assert_eq!(ids(&only("voted")), vec![2]);
    }

    #[test]
    fn no_flags_falls_back_to_non_ended() {
        let polls = sample();
        let filters = PollFilters {
            active: false,
            ..PollFilters::default()
        };
        let ids: Vec<PollId> = filter_polls(&polls, &filters, None)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn search_matches_title_and_id() {
        let mut polls = sample();
        polls[3].title = "Favorite season".to_string();
        let mut filters = PollFilters {
            active: false,
            ..PollFilters::default()
        };
        filters.search = "SEASON".to_string();
        let found = filter_polls(&polls, &filters, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);

        filters.search = "2".to_string();
        let found = filter_polls(&polls, &filters, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[test]
    fn active_flag_overrides_search_for_live_polls() {
        // first-match-wins: an active poll is included even when the search
        // text does not match it.
        let polls = sample();
        let mut filters = PollFilters::default();
        filters.search = "no such title".to_string();
        let ids: Vec<PollId> = filter_polls(&polls, &filters, None)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn newest_sorts_descending_by_id() {
        let polls: Vec<PollSummary> = [3u64, 1, 4, 5].iter().map(|id| poll(*id, false)).collect();
        let sorted = sort_polls(polls, SortBy::Newest);
        let ids: Vec<PollId> = sorted.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 1]);
    }

    #[test]
    fn most_votes_sorts_descending_by_tally() {
        let mut polls = sample();
        polls[0].total_votes = 7;
        polls[3].total_votes = 20;
        let sorted = sort_polls(polls, SortBy::MostVotes);
        let votes: Vec<u64> = sorted.iter().map(|p| p.total_votes).collect();
        assert_eq!(votes, vec![20, 7, 0, 0]);
    }

    #[test]
    fn ending_soon_puts_every_ended_poll_last() {
        let mut polls = sample();
        polls[0].end_time = 5_000;
        polls[2].end_time = 2_000;
        let sorted = sort_polls(polls, SortBy::EndingSoon);
        let ids: Vec<PollId> = sorted.iter().map(|p| p.id).collect();
        // active ascending by end time, then ended descending by end time
        assert_eq!(ids, vec![2, 0, 3, 1]);
        let first_ended = sorted.iter().position(|p| p.ended).unwrap();
        assert!(sorted[first_ended..].iter().all(|p| p.ended));
    }

    #[test]
    fn filter_summary_labels() {
        let mut filters = PollFilters::default();
        assert_eq!(filters.summary(), "Active");
        filters.ended = true;
        assert_eq!(filters.summary(), "All Status");
        filters.my_polls = true;
        filters.search = "cats".to_string();
        assert_eq!(filters.summary(), "All Status • My Polls • \"cats\"");
        filters.clear();
        filters.active = false;
        assert_eq!(filters.summary(), "All Polls");
    }

    #[test]
    fn default_filters_count_the_active_flag() {
        let mut filters = PollFilters::default();
        assert_eq!(filters.active_filter_count(), 1);
        filters.sort_by = SortBy::MostVotes;
        filters.voted = true;
        assert_eq!(filters.active_filter_count(), 3);
    }

    #[test]
    fn poll_status_thresholds() {
        let now = 10_000;
        let mut p = poll(0, false);
        p.end_time = now + 30 * 60;
        assert_eq!(poll_status(&p, now), PollStatus::EndingSoon);
        p.end_time = now + 5 * HOUR_SECS;
        assert_eq!(poll_status(&p, now), PollStatus::EndingToday);
        p.end_time = now + 3 * DAY_SECS;
        assert_eq!(poll_status(&p, now), PollStatus::Active);
        p.ended = true;
        assert_eq!(poll_status(&p, now), PollStatus::Ended);
    }

    #[test]
    fn time_remaining_text() {
        assert_eq!(time_remaining(0, 10), "Ended");
        assert_eq!(time_remaining(2 * DAY_SECS + 3 * HOUR_SECS, 0), "2d 3h");
        assert_eq!(time_remaining(3 * HOUR_SECS + 12 * 60, 0), "3h 12m");
        assert_eq!(time_remaining(45 * 60, 0), "45m");
    }

    #[test]
    fn set_stats_aggregate() {
        let mut polls = sample();
        polls[0].total_votes = 4;
        polls[1].total_votes = 2;
        let stats = poll_set_stats(&polls, Some(addr(2)));
        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.ended, 2);
        assert_eq!(stats.mine, 1);
        assert_eq!(stats.voted, 1);
        assert_eq!(stats.total_votes, 6);
        assert!((stats.average_votes - 1.5).abs() < f64::EPSILON);
    }
}
