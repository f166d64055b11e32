//! Team formation after captain selection
//!
//! `captain_draft` lets captains pick players one at a time, team A first
//! and then whichever team is smaller. `skill_balanced` places everyone at
//! once, strongest first, onto the team with the lower total rating.

use crate::config::TeamBalancing;
use crate::error::{MatchmakingError, Result};
use crate::types::{Match, MatchStatus, PlayerId, Team};

/// Team whose captain picks next
pub fn next_drafting_team(room: &Match) -> Team {
    if room.team_a.len() <= room.team_b.len() {
        Team::A
    } else {
        Team::B
    }
}

/// Run the configured strategy right after captains were placed
///
/// Returns true once every player is on a team, in which case the room has
/// moved to map ban. A two-player room is complete as soon as both captains
/// are placed, whatever the strategy.
pub(crate) fn form_after_captains(room: &mut Match, balancing: TeamBalancing) -> bool {
    if balancing == TeamBalancing::SkillBalanced {
        balance_by_skill(room);
    }
    finish_if_complete(room)
}

/// Let `captain_id` add `player_id` to their team
///
/// Returns true when this pick completed both teams.
pub(crate) fn draft_pick(room: &mut Match, captain_id: &str, player_id: &str) -> Result<bool> {
    room.require_status(&[MatchStatus::TeamDraft])?;

    if !room.has_player(captain_id) {
        return Err(MatchmakingError::PlayerNotInMatch {
            match_id: room.id,
            player_id: captain_id.to_string(),
        });
    }

    let team = next_drafting_team(room);
    if room.captain_of(team).map(String::as_str) != Some(captain_id) {
        return Err(MatchmakingError::NotCaptainsTurn {
            match_id: room.id,
            captain_id: captain_id.to_string(),
        });
    }

    let match_id = room.id;
    let player = room
        .player_mut(player_id)
        .ok_or_else(|| MatchmakingError::PlayerNotInMatch {
            match_id,
            player_id: player_id.to_string(),
        })?;
    if player.team.is_some() {
        return Err(MatchmakingError::AlreadyDrafted {
            match_id,
            player_id: player_id.to_string(),
        });
    }

    player.team = Some(team);
    assign(room, team, player_id.to_string());

    Ok(finish_if_complete(room))
}

/// Place every unassigned player, highest rating first, on the team with
/// the lower total rating that still has a free slot
pub(crate) fn balance_by_skill(room: &mut Match) {
    let total = room.players.len();
    let slots_a = (total + 1) / 2;
    let slots_b = total / 2;

    let mut sum_a = team_rating(room, Team::A);
    let mut sum_b = team_rating(room, Team::B);

    let mut pending: Vec<(PlayerId, i32)> = room
        .unassigned_players()
        .map(|p| (p.user_id.clone(), p.skill_rating))
        .collect();
    // Stable: equal ratings keep roster order
    pending.sort_by(|a, b| b.1.cmp(&a.1));

    for (player_id, rating) in pending {
        let a_open = room.team_a.len() < slots_a;
        let b_open = room.team_b.len() < slots_b;

        let team = match (a_open, b_open) {
            (true, true) if sum_a <= sum_b => Team::A,
            (true, true) => Team::B,
            (true, false) => Team::A,
            (false, _) => Team::B,
        };

        match team {
            Team::A => sum_a += i64::from(rating),
            Team::B => sum_b += i64::from(rating),
        }
        if let Some(player) = room.player_mut(&player_id) {
            player.team = Some(team);
        }
        assign(room, team, player_id);
    }
}

/// Sum of ratings currently on `team`
pub fn team_rating(room: &Match, team: Team) -> i64 {
    room.players
        .iter()
        .filter(|p| p.team == Some(team))
        .map(|p| i64::from(p.skill_rating))
        .sum()
}

fn assign(room: &mut Match, team: Team, player_id: PlayerId) {
    match team {
        Team::A => room.team_a.push(player_id),
        Team::B => room.team_b.push(player_id),
    }
}

fn finish_if_complete(room: &mut Match) -> bool {
    if room.all_players_assigned() {
        room.status = MatchStatus::MapBan;
        true
    } else {
        false
    }
}
