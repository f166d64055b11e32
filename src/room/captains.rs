//! Captain selection
//!
//! Two strategies pick the pair of captains for a ready room:
//!
//! - `random`: a fair shuffle of the roster, the first two become captains.
//! - `voting`: every roster player votes once (a later vote replaces an
//!   earlier one). When everyone has voted the two most-voted candidates win.
//!
//! Vote counting walks the roster in order and counts each voter's choice,
//! so candidates enter the tally in first-seen order. A stable sort by count
//! then breaks ties in favour of the candidate seen first.
//!
//! Selecting captains puts captain1 on team A and captain2 on team B and
//! hands the room over to team formation.

use crate::config::TeamBalancing;
use crate::error::{MatchmakingError, Result};
use crate::room::teams;
use crate::types::{
    CaptainSelectionMethod, Match, MatchPlayer, MatchStatus, PlayerId, PlayerRole, Team,
};
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Result of a step that chose both captains
#[derive(Debug, Clone, PartialEq)]
pub struct CaptainOutcome {
    pub method: CaptainSelectionMethod,
    pub captain1: PlayerId,
    pub captain2: PlayerId,
    /// Every player already has a team, the room moved on to map ban
    pub teams_formed: bool,
}

/// Pick two distinct captains uniformly at random
pub fn select_random_captains(players: &[MatchPlayer]) -> Option<(PlayerId, PlayerId)> {
    if players.len() < 2 {
        return None;
    }

    let mut ids: Vec<&PlayerId> = players.iter().map(|p| &p.user_id).collect();
    ids.shuffle(&mut rand::thread_rng());

    Some((ids[0].clone(), ids[1].clone()))
}

/// Count votes in first-seen order, highest count first
pub fn count_votes(
    players: &[MatchPlayer],
    votes: &HashMap<PlayerId, PlayerId>,
) -> Vec<(PlayerId, usize)> {
    let mut tally: Vec<(PlayerId, usize)> = Vec::new();

    for voter in players {
        let Some(candidate) = votes.get(&voter.user_id) else {
            continue;
        };
        match tally.iter_mut().find(|(id, _)| id == candidate) {
            Some((_, count)) => *count += 1,
            None => tally.push((candidate.clone(), 1)),
        }
    }

    // Stable: equal counts keep first-seen order
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
}

/// Decide captains from a complete set of votes
///
/// With a single voted candidate, captain2 is the first roster player who is
/// not that candidate.
pub fn tally_captains(
    players: &[MatchPlayer],
    votes: &HashMap<PlayerId, PlayerId>,
) -> Option<(PlayerId, PlayerId)> {
    let tally = count_votes(players, votes);

    match tally.as_slice() {
        [] => None,
        [(only, _)] => players
            .iter()
            .find(|p| &p.user_id != only)
            .map(|p| (only.clone(), p.user_id.clone())),
        [(first, _), (second, _), ..] => Some((first.clone(), second.clone())),
    }
}

/// Record captains, seed both teams and move to team formation
pub(crate) fn apply_captains(
    room: &mut Match,
    method: CaptainSelectionMethod,
    captain1: PlayerId,
    captain2: PlayerId,
    balancing: TeamBalancing,
) -> CaptainOutcome {
    for player in room.players.iter_mut() {
        if player.user_id == captain1 {
            player.role = Some(PlayerRole::Captain);
            player.team = Some(Team::A);
        } else if player.user_id == captain2 {
            player.role = Some(PlayerRole::Captain);
            player.team = Some(Team::B);
        } else {
            player.role = Some(PlayerRole::Player);
            player.team = None;
        }
    }

    room.team_a = vec![captain1.clone()];
    room.team_b = vec![captain2.clone()];
    room.captain1 = Some(captain1.clone());
    room.captain2 = Some(captain2.clone());
    room.status = MatchStatus::TeamDraft;

    let teams_formed = teams::form_after_captains(room, balancing);

    CaptainOutcome {
        method,
        captain1,
        captain2,
        teams_formed,
    }
}

/// Choose how captains are picked
///
/// Returns the outcome when captains were chosen right away (`random`) and
/// `None` when a vote was opened.
pub(crate) fn set_method(
    room: &mut Match,
    method: CaptainSelectionMethod,
    balancing: TeamBalancing,
) -> Result<Option<CaptainOutcome>> {
    if room.captain_selection_method.is_some() {
        return Err(MatchmakingError::CaptainMethodAlreadySet { match_id: room.id });
    }
    room.require_status(&[MatchStatus::Ready, MatchStatus::CaptainSelection])?;

    match method {
        CaptainSelectionMethod::Random => {
            let (captain1, captain2) = select_random_captains(&room.players).ok_or(
                MatchmakingError::InsufficientPlayers {
                    required: 2,
                    available: room.players.len(),
                },
            )?;
            room.captain_selection_method = Some(method);
            Ok(Some(apply_captains(
                room, method, captain1, captain2, balancing,
            )))
        }
        CaptainSelectionMethod::Voting => {
            room.captain_selection_method = Some(method);
            room.captain_candidates = room.player_ids();
            room.captain_votes.clear();
            room.status = MatchStatus::CaptainVoting;
            Ok(None)
        }
    }
}

/// Record `voter_id`'s vote, tallying once every roster player has voted
pub(crate) fn cast_vote(
    room: &mut Match,
    voter_id: &str,
    candidate_id: &str,
    balancing: TeamBalancing,
) -> Result<Option<CaptainOutcome>> {
    room.require_status(&[MatchStatus::CaptainVoting])?;

    if !room.has_player(voter_id) {
        return Err(MatchmakingError::VoterNotInMatch {
            match_id: room.id,
            voter_id: voter_id.to_string(),
        });
    }
    if !room.captain_candidates.iter().any(|c| c == candidate_id) {
        return Err(MatchmakingError::InvalidCandidate {
            match_id: room.id,
            candidate_id: candidate_id.to_string(),
        });
    }

    room.captain_votes
        .insert(voter_id.to_string(), candidate_id.to_string());

    if room.captain_votes.len() < room.players.len() {
        return Ok(None);
    }

    let (captain1, captain2) =
        tally_captains(&room.players, &room.captain_votes).ok_or_else(|| {
            MatchmakingError::InternalError {
                message: format!("Vote tally for match {} produced no captains", room.id),
            }
        })?;

    Ok(Some(apply_captains(
        room,
        CaptainSelectionMethod::Voting,
        captain1,
        captain2,
        balancing,
    )))
}
