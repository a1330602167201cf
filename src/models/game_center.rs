use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub player: String,
    pub avatar: String,
    pub country: String,
    pub score: u64,
    pub best_streak: u32,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub game_title: String,
    pub description: String,
    pub progress: u32,
    pub target: u32,
    #[serde(default)]
    pub rarity: Rarity,
    pub icon: String,
}

impl Achievement {
    /// Completion percentage, rounded and clamped to 0 - 100.
    ///
    /// An achievement without a target reports 0.
    pub fn progress_percent(&self) -> u8 {
        if self.target == 0 {
            return 0;
        }

        let ratio = f64::from(self.progress) / f64::from(self.target);
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardSortKey {
    Score,
    Streak,
    Name,
}

/// Return a sorted copy of the leaderboard; the input order is kept for ties
pub fn sort_leaderboard(
    entries: &[LeaderboardEntry],
    key: LeaderboardSortKey,
) -> Vec<LeaderboardEntry> {
    let mut sorted = entries.to_vec();
    match key {
        LeaderboardSortKey::Score => sorted.sort_by(|a, b| b.score.cmp(&a.score)),
        LeaderboardSortKey::Streak => sorted.sort_by(|a, b| b.best_streak.cmp(&a.best_streak)),
        LeaderboardSortKey::Name => sorted.sort_by(|a, b| a.player.cmp(&b.player)),
    }
    sorted
}

/// Format a score with en-US thousands separators (`1234567` -> `1,234,567`)
pub fn format_score(score: u64) -> String {
    let digits = score.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

pub fn format_players_online(count: u64) -> String {
    format!("{} online", format_score(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player: &str, score: u64, best_streak: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            id: player.to_lowercase(),
            player: player.to_string(),
            avatar: String::new(),
            country: "US".to_string(),
            score,
            best_streak,
            trend: Trend::Steady,
        }
    }

    #[test]
    fn test_sort_leaderboard() {
        let entries = vec![
            entry("Diego", 9_000, 14),
            entry("Amelia", 12_500, 9),
            entry("Kenji", 7_200, 11),
        ];

        let by_score = sort_leaderboard(&entries, LeaderboardSortKey::Score);
        assert_eq!(by_score[0].player, "Amelia");

        let by_streak = sort_leaderboard(&entries, LeaderboardSortKey::Streak);
        assert_eq!(by_streak[0].player, "Diego");

        let by_name = sort_leaderboard(&entries, LeaderboardSortKey::Name);
        assert_eq!(by_name[0].player, "Amelia");
        assert_eq!(by_name[2].player, "Kenji");

        // Input untouched
        assert_eq!(entries[0].player, "Diego");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0), "0");
        assert_eq!(format_score(999), "999");
        assert_eq!(format_score(1_000), "1,000");
        assert_eq!(format_score(1_234_567), "1,234,567");
        assert_eq!(format_players_online(742), "742 online");
        assert_eq!(format_players_online(12_034), "12,034 online");
    }

    #[test]
    fn test_progress_percent() {
        let mut achievement = Achievement {
            id: "a".to_string(),
            title: "Combo".to_string(),
            game_title: "Neon Knights".to_string(),
            description: String::new(),
            progress: 2,
            target: 3,
            rarity: Rarity::Rare,
            icon: String::new(),
        };
        assert_eq!(achievement.progress_percent(), 67);

        achievement.progress = 10;
        assert_eq!(achievement.progress_percent(), 100);

        achievement.target = 0;
        assert_eq!(achievement.progress_percent(), 0);
    }

    #[test]
    fn test_rarity_label() {
        assert_eq!(Rarity::Epic.to_string(), "Epic");
        assert_eq!(Rarity::default().to_string(), "Common");
    }
}
