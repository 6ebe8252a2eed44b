//! Players, color assignment and match results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("at most 4 players")]
    TooManyPlayers,
    #[error("at least 2 players")]
    TooFewPlayers,
    #[error("no player at index {0}")]
    NoSuchPlayer(usize),
    #[error("unknown color {0:?}")]
    UnknownColor(String),
    #[error("no unassigned color left")]
    NoFreeColor,
    #[error("palette needs at least 2 colors")]
    PaletteTooSmall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Id of the assigned color profile.
    pub color: String,
}

/// Two to four players with pairwise distinct colors from a fixed palette.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    palette: Vec<String>,
    players: Vec<Player>,
}

impl Roster {
    /// Two default players holding the first two palette colors.
    pub fn new(palette: Vec<String>) -> Result<Self, RosterError> {
        if palette.len() < MIN_PLAYERS {
            return Err(RosterError::PaletteTooSmall);
        }
        let players = (0..MIN_PLAYERS)
            .map(|i| Player {
                name: default_name(i),
                color: palette[i].clone(),
            })
            .collect();
        Ok(Self { palette, players })
    }

    /// Roster from loaded data; duplicate colors are repaired.
    pub fn from_players(palette: Vec<String>, players: Vec<Player>) -> Result<Self, RosterError> {
        if palette.len() < MIN_PLAYERS {
            return Err(RosterError::PaletteTooSmall);
        }
        if players.len() < MIN_PLAYERS {
            return Err(RosterError::TooFewPlayers);
        }
        if players.len() > MAX_PLAYERS.min(palette.len()) {
            return Err(RosterError::TooManyPlayers);
        }
        if let Some(p) = players.iter().find(|p| !palette.contains(&p.color)) {
            return Err(RosterError::UnknownColor(p.color.clone()));
        }
        let mut roster = Self { palette, players };
        roster.enforce_unique_colors();
        Ok(roster)
    }

    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[inline]
    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Append a player with the first unassigned color. Returns its index.
    pub fn add_player(&mut self) -> Result<usize, RosterError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(RosterError::TooManyPlayers);
        }
        let color = self
            .palette
            .iter()
            .find(|c| !self.players.iter().any(|p| &p.color == *c))
            .cloned()
            .ok_or(RosterError::NoFreeColor)?;
        self.players.push(Player {
            name: default_name(self.players.len()),
            color,
        });
        Ok(self.players.len() - 1)
    }

    /// Drop the last player, keeping at least two.
    pub fn remove_player(&mut self) -> Result<Player, RosterError> {
        if self.players.len() <= MIN_PLAYERS {
            return Err(RosterError::TooFewPlayers);
        }
        self.players.pop().ok_or(RosterError::TooFewPlayers)
    }

    pub fn rename(&mut self, idx: usize, name: impl Into<String>) -> Result<(), RosterError> {
        let p = self
            .players
            .get_mut(idx)
            .ok_or(RosterError::NoSuchPlayer(idx))?;
        p.name = name.into();
        Ok(())
    }

    /// Give `color` to player `idx`. A current holder receives the old
    /// color of `idx` in exchange.
    pub fn set_player_color(&mut self, idx: usize, color: &str) -> Result<(), RosterError> {
        if idx >= self.players.len() {
            return Err(RosterError::NoSuchPlayer(idx));
        }
        if !self.palette.iter().any(|c| c == color) {
            return Err(RosterError::UnknownColor(color.to_string()));
        }
        if self.players[idx].color == color {
            return Ok(());
        }
        let prev = std::mem::replace(&mut self.players[idx].color, color.to_string());
        if let Some(other) = self
            .players
            .iter_mut()
            .enumerate()
            .find(|(i, p)| *i != idx && p.color == color)
            .map(|(_, p)| p)
        {
            other.color = prev;
        }
        Ok(())
    }

    /// Reassign repeated colors to the first free palette entry, keeping the
    /// first holder of each color.
    pub fn enforce_unique_colors(&mut self) {
        let mut used: Vec<String> = Vec::with_capacity(self.players.len());
        for i in 0..self.players.len() {
            let color = self.players[i].color.clone();
            if !used.contains(&color) {
                used.push(color);
                continue;
            }
            if let Some(free) = self.palette.iter().find(|c| !used.contains(c)).cloned() {
                log::debug!(
                    "player {:?}: color {color} taken, using {free}",
                    self.players[i].name
                );
                self.players[i].color = free.clone();
                used.push(free);
            }
        }
    }
}

fn default_name(idx: usize) -> String {
    format!("Player {}", idx + 1)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub name: String,
    pub color: String,
    pub score: u32,
}

/// Scores in roster order plus the descending ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub scores: Vec<PlayerScore>,
    /// Highest score first; equal scores keep roster order.
    pub ranking: Vec<PlayerScore>,
}

impl MatchOutcome {
    /// Top-ranked player, if they scored at all.
    pub fn winner(&self) -> Option<&PlayerScore> {
        self.ranking.first().filter(|p| p.score > 0)
    }

    pub fn top_score(&self) -> u32 {
        self.ranking.first().map_or(0, |p| p.score)
    }

    pub fn to_record(&self, timestamp: DateTime<Utc>) -> MatchRecord {
        MatchRecord {
            timestamp,
            scores: self.scores.clone(),
            winner_name: self.winner().map(|p| p.name.clone()),
            top_score: self.top_score(),
        }
    }
}

/// Score every player by the count of their color.
pub fn score_match(roster: &Roster, count_of: impl Fn(&str) -> u32) -> MatchOutcome {
    let scores: Vec<PlayerScore> = roster
        .players()
        .iter()
        .map(|p| PlayerScore {
            name: p.name.clone(),
            color: p.color.clone(),
            score: count_of(&p.color),
        })
        .collect();
    let mut ranking = scores.clone();
    ranking.sort_by(|a, b| b.score.cmp(&a.score));
    MatchOutcome { scores, ranking }
}

/// One finished capture, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub timestamp: DateTime<Utc>,
    pub scores: Vec<PlayerScore>,
    /// `None` when nobody scored.
    pub winner_name: Option<String>,
    pub top_score: u32,
}

impl MatchRecord {
    /// `"name:score, name:score"` in roster order.
    pub fn details(&self) -> String {
        self.scores
            .iter()
            .map(|p| format!("{}:{}", p.name, p.score))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Summary over a history list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub games: usize,
    /// Most frequent winner and their win count; games without a winner do
    /// not count.
    pub top_winner: Option<(String, usize)>,
}

impl HistoryStats {
    pub fn from_records(records: &[MatchRecord]) -> Self {
        let mut wins: Vec<(String, usize)> = Vec::new();
        for name in records.iter().filter_map(|r| r.winner_name.as_ref()) {
            match wins.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 += 1,
                None => wins.push((name.clone(), 1)),
            }
        }
        wins.sort_by(|a, b| b.1.cmp(&a.1));
        Self {
            games: records.len(),
            top_winner: wins.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn palette() -> Vec<String> {
        ["magenta", "yellow", "blue", "green"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn colors(r: &Roster) -> Vec<&str> {
        r.players().iter().map(|p| p.color.as_str()).collect()
    }

    fn assert_unique(r: &Roster) {
        let mut c = colors(r);
        c.sort_unstable();
        c.dedup();
        assert_eq!(c.len(), r.len());
    }

    #[test]
    fn add_and_remove_players() {
        let mut r = Roster::new(palette()).unwrap();
        assert_eq!(colors(&r), ["magenta", "yellow"]);
        assert_eq!(r.add_player(), Ok(2));
        assert_eq!(r.players()[2].color, "blue");
        assert_eq!(r.players()[2].name, "Player 3");
        r.add_player().unwrap();
        assert_eq!(r.add_player(), Err(RosterError::TooManyPlayers));
        r.remove_player().unwrap();
        r.remove_player().unwrap();
        assert_eq!(r.remove_player(), Err(RosterError::TooFewPlayers));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn set_color_swaps_with_holder() {
        let mut r = Roster::new(palette()).unwrap();
        r.add_player().unwrap();
        r.set_player_color(0, "blue").unwrap();
        assert_eq!(colors(&r), ["blue", "yellow", "magenta"]);
        r.set_player_color(1, "green").unwrap();
        assert_eq!(colors(&r), ["blue", "green", "magenta"]);
        assert_eq!(
            r.set_player_color(1, "orange"),
            Err(RosterError::UnknownColor("orange".into()))
        );
        assert_eq!(r.set_player_color(5, "blue"), Err(RosterError::NoSuchPlayer(5)));
    }

    #[test]
    fn color_assignment_stays_bijective() {
        let mut r = Roster::new(palette()).unwrap();
        r.add_player().unwrap();
        r.add_player().unwrap();
        let ops = [(0, "green"), (3, "magenta"), (2, "green"), (1, "blue"), (0, "yellow")];
        for (i, (idx, color)) in ops.iter().cycle().take(23).enumerate() {
            r.set_player_color((idx + i) % 4, color).unwrap();
            assert_unique(&r);
        }
    }

    fn player(name: &str, color: &str) -> Player {
        Player {
            name: name.into(),
            color: color.into(),
        }
    }

    #[test]
    fn loaded_duplicates_are_repaired() {
        let players = vec![
            player("A", "yellow"),
            player("B", "yellow"),
            player("C", "magenta"),
        ];
        let r = Roster::from_players(palette(), players).unwrap();
        assert_eq!(colors(&r), ["yellow", "magenta", "blue"]);

        let bad = vec![
            player("A", "red"),
            player("B", "yellow"),
        ];
        assert_eq!(
            Roster::from_players(palette(), bad),
            Err(RosterError::UnknownColor("red".into()))
        );
    }

    #[test]
    fn magenta_beats_yellow() {
        let r = Roster::new(palette()).unwrap();
        let outcome = score_match(&r, |c| match c {
            "magenta" => 5,
            "yellow" => 3,
            _ => 0,
        });
        assert_eq!(outcome.scores[0].score, 5);
        assert_eq!(outcome.scores[1].score, 3);
        let w = outcome.winner().unwrap();
        assert_eq!(w.name, "Player 1");
        assert_eq!(w.color, "magenta");

        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        let rec = outcome.to_record(ts);
        assert_eq!(rec.winner_name.as_deref(), Some("Player 1"));
        assert_eq!(rec.top_score, 5);
        assert_eq!(rec.details(), "Player 1:5, Player 2:3");
    }

    #[test]
    fn no_pieces_means_no_winner() {
        let r = Roster::new(palette()).unwrap();
        let outcome = score_match(&r, |_| 0);
        assert!(outcome.winner().is_none());
        assert_eq!(outcome.top_score(), 0);
        assert!(outcome.scores.iter().all(|p| p.score == 0));
        assert_eq!(outcome.to_record(Utc::now()).winner_name, None);
    }

    #[test]
    fn ties_keep_roster_order() {
        let mut r = Roster::new(palette()).unwrap();
        r.add_player().unwrap();
        let outcome = score_match(&r, |c| if c == "magenta" { 1 } else { 4 });
        let names: Vec<_> = outcome.ranking.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Player 2", "Player 3", "Player 1"]);
    }

    #[test]
    fn stats_skip_games_without_winner() {
        let r = Roster::new(palette()).unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        let p1 = score_match(&r, |c| u32::from(c == "magenta")).to_record(ts);
        let p2 = score_match(&r, |c| u32::from(c == "yellow")).to_record(ts);
        let none = score_match(&r, |_| 0).to_record(ts);
        let stats =
            HistoryStats::from_records(&[none.clone(), p2, none.clone(), none, p1.clone(), p1]);
        assert_eq!(stats.games, 6);
        assert_eq!(stats.top_winner, Some(("Player 1".to_string(), 2)));
        assert_eq!(HistoryStats::from_records(&[]).top_winner, None);
    }
}
