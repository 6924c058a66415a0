// spec.md §4.6 Auth Engine. Dispatches on event type the way the
// Matrix auth rules do: `m.room.create` is special-cased (it has no
// auth_events to check against), every other event requires a create
// event to already be in state, and `m.room.member`/`m.room.power_levels`
// carry rules beyond the generic power-level gate.

use crate::join_rules::JoinRule;
use crate::membership::Membership;
use crate::power_levels::PowerLevels;
use crate::reject::AuthReject;
use crate::state::AuthState;
use submerge_model::{Event, RoomVersion};

type AuthResult = Result<(), AuthReject>;

/// spec.md §4.6: "the auth decision is a pure function of (event,
/// auth-event set, room-version)."
pub fn authorize(event: &Event, state: &AuthState, _version: RoomVersion) -> AuthResult {
    check_required_signatures(event)?;

    if event.kind == "m.room.create" {
        return authorize_create(event);
    }

    let create = state.create.ok_or(AuthReject::MissingCreateEvent)?;
    if create.room_id != event.room_id {
        return Err(AuthReject::RoomIdMismatch);
    }

    let creator = creator_of(create);
    let power_levels = state
        .power_levels
        .map(|e| PowerLevels::from_content(&e.content))
        .unwrap_or_else(|| PowerLevels::default_for_creator(creator));

    match event.kind.as_str() {
        "m.room.member" => authorize_member(event, state, &power_levels),
        "m.room.power_levels" => authorize_power_levels(event, state, &power_levels),
        _ => authorize_generic(event, state, &power_levels),
    }
}

fn creator_of(create: &Event) -> &str {
    // v1-v10 content.creator; v11 dropped the field in favor of the
    // sender being authoritative. Either way the create event's own
    // sender is the room's creator.
    create
        .content
        .get("creator")
        .and_then(|v| v.as_str())
        .unwrap_or(create.sender.as_str())
}

fn authorize_create(event: &Event) -> AuthResult {
    if event.depth != 1 {
        return Err(AuthReject::CreateNotFirst);
    }
    let creator = creator_of(event);
    if creator != event.sender.as_str() {
        return Err(AuthReject::CreateSenderMismatch);
    }
    Ok(())
}

fn authorize_member(event: &Event, state: &AuthState, power_levels: &PowerLevels) -> AuthResult {
    let content_membership = event
        .content
        .get("membership")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AuthReject::MalformedContent("missing membership".into()))?;
    let proposed =
        Membership::parse(content_membership).ok_or_else(|| AuthReject::UnknownMembership(content_membership.to_string()))?;
    let target = event
        .state_key
        .as_deref()
        .ok_or_else(|| AuthReject::MalformedContent("m.room.member without state_key".into()))?;

    let current = state
        .member(target)
        .and_then(|e| e.content.get("membership"))
        .and_then(|v| v.as_str())
        .and_then(Membership::parse);

    if !Membership::transition_allowed(current, proposed) {
        return Err(AuthReject::MembershipTransitionNotAllowed {
            current: current.map(|m| format!("{m:?}").to_lowercase()),
            proposed: format!("{proposed:?}").to_lowercase(),
        });
    }

    let join_rule = state
        .join_rules
        .and_then(|e| e.content.get("join_rule"))
        .and_then(|v| v.as_str())
        .map(JoinRule::parse)
        .unwrap_or(JoinRule::Invite);

    match proposed {
        Membership::Join => {
            if target != event.sender.as_str() {
                return Err(AuthReject::MalformedContent("join target must be the sender".into()));
            }
            // Bootstrap case: the room's creator joining their own
            // brand-new room, before any join_rules event exists to
            // consult. Every later join from anyone else still goes
            // through the normal join_rule gate below.
            let creator = state.create.map(creator_of);
            if current.is_none() && creator == Some(target) {
                return Ok(());
            }
            match join_rule {
                JoinRule::Public => {}
                JoinRule::Restricted | JoinRule::KnockRestricted => {
                    // An authorized restricted join must have been
                    // countersigned (checked in check_required_signatures
                    // via join_authorised_via_users_server); a prior
                    // invite also satisfies a restricted room.
                    if current != Some(Membership::Invite)
                        && event.content.get("join_authorised_via_users_server").is_none()
                    {
                        return Err(AuthReject::JoinRuleForbids(join_rule));
                    }
                }
                JoinRule::Invite | JoinRule::Knock if current == Some(Membership::Invite) => {}
                _ => return Err(AuthReject::JoinRuleForbids(join_rule)),
            }
        }
        Membership::Knock => {
            if !matches!(join_rule, JoinRule::Knock | JoinRule::KnockRestricted) {
                return Err(AuthReject::JoinRuleForbids(join_rule));
            }
        }
        Membership::Invite => {
            let have = power_levels.for_user(event.sender.as_str());
            if have < power_levels.invite {
                return Err(AuthReject::InsufficientPowerForMembership {
                    proposed: "invite".into(),
                    required: power_levels.invite,
                    have,
                });
            }
        }
        Membership::Ban => {
            let have = power_levels.for_user(event.sender.as_str());
            if have < power_levels.ban {
                return Err(AuthReject::InsufficientPowerForMembership {
                    proposed: "ban".into(),
                    required: power_levels.ban,
                    have,
                });
            }
        }
        Membership::Leave => {
            if target != event.sender.as_str() {
                // a kick: sender must hold at least kick power and
                // outrank the target (can't kick someone with >= power).
                let have = power_levels.for_user(event.sender.as_str());
                let target_power = power_levels.for_user(target);
                if have < power_levels.kick || have <= target_power {
                    return Err(AuthReject::InsufficientPowerForMembership {
                        proposed: "leave".into(),
                        required: power_levels.kick.max(target_power + 1),
                        have,
                    });
                }
            }
        }
    }
    Ok(())
}

fn authorize_power_levels(event: &Event, _state: &AuthState, current: &PowerLevels) -> AuthResult {
    let have = current.for_user(event.sender.as_str());
    let required = current.required_for_event(&event.kind, true);
    if have < required {
        return Err(AuthReject::InsufficientPowerForEvent {
            event_type: event.kind.clone(),
            required,
            have,
        });
    }
    // A sender may not grant power exceeding their own, nor reduce
    // anyone (including themself) to a level they themselves outrank
    // only if they're not already at or above that user's current level.
    let proposed = PowerLevels::from_content(&event.content);
    for (user, &level) in &proposed.users {
        let existing = current.for_user(user);
        if level != existing && have < level.max(existing) {
            return Err(AuthReject::InsufficientPowerForEvent {
                event_type: event.kind.clone(),
                required: level.max(existing),
                have,
            });
        }
    }
    Ok(())
}

fn authorize_generic(event: &Event, _state: &AuthState, power_levels: &PowerLevels) -> AuthResult {
    let have = power_levels.for_user(event.sender.as_str());
    let required = power_levels.required_for_event(&event.kind, event.is_state_event());
    if have < required {
        return Err(AuthReject::InsufficientPowerForEvent {
            event_type: event.kind.clone(),
            required,
            have,
        });
    }
    Ok(())
}

/// spec.md §4.6: "Signatures: all senders and (for joins) the resident
/// server must have signed." Cryptographic verification that a
/// signature is *valid* happens in submerge-vm's Verify phase; this is
/// the structural check that the *required* signers are present at all.
fn check_required_signatures(event: &Event) -> AuthResult {
    if !event.signatures.contains_key(&event.origin) {
        return Err(AuthReject::MissingRequiredSignature {
            server: event.origin.clone(),
        });
    }
    if event.kind == "m.room.member" {
        if let Some("join") = event.content.get("membership").and_then(|v| v.as_str()) {
            if let Some(via) = event
                .content
                .get("join_authorised_via_users_server")
                .and_then(|v| v.as_str())
            {
                let authorising_server = server_of(via);
                if !event.signatures.contains_key(authorising_server) {
                    return Err(AuthReject::MissingRequiredSignature {
                        server: authorising_server.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn server_of(mxid: &str) -> &str {
    mxid.split_once(':').map(|(_, server)| server).unwrap_or(mxid)
}
