//! Tag value formatting.
//!
//! Pure functions from flight facts, the matched rule and coordination
//! state to the strings shown in the radar tag. Colors and fonts belong
//! to the host; a [`TagColor`] hint is all the core emits.

use crate::authority::{OnlineSnapshot, SectorOwnershipTable};
use crate::coordination::{CoordinationState, CoordinationStatus};
use crate::models::{CoordinationRule, FlightFacts, PlanType, RuleCategory, NO_AGREEMENT_TEXT};
use crate::store::RuleStore;

/// Coordination altitudes below this are host placeholder values.
const MIN_COORDINATED_ALTITUDE_FT: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagColor {
    #[default]
    Default,
    RequestFromMe,
    RequestToMe,
    Accepted,
    Refused,
}

/// One rendered tag field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValue {
    pub text: String,
    pub color: TagColor,
}

impl TagValue {
    fn blank() -> Self {
        Self::plain("")
    }

    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: TagColor::Default,
        }
    }

    fn colored(text: impl Into<String>, color: TagColor) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

fn is_loa_eligible(facts: &FlightFacts) -> bool {
    facts.state.is_loa_relevant() && facts.plan_type == PlanType::Ifr
}

/// A flight-level value formatted the way the tag shows altitudes.
fn level_text(altitude_ft: i32) -> String {
    format!("{:03}", altitude_ft / 100)
}

fn coordinated_altitude_tag(coordination: Option<&CoordinationState>) -> Option<TagValue> {
    let state = coordination?;
    let altitude = state.exit_altitude_ft?;
    if altitude < MIN_COORDINATED_ALTITUDE_FT {
        return None;
    }
    let text = level_text(altitude);
    match state.exit_altitude_status {
        CoordinationStatus::RequestedByMe => {
            Some(TagValue::colored(text, TagColor::RequestFromMe))
        }
        CoordinationStatus::RequestedByOther => {
            Some(TagValue::colored(text, TagColor::RequestToMe))
        }
        CoordinationStatus::Accepted => Some(TagValue::colored(text, TagColor::Accepted)),
        CoordinationStatus::Refused => Some(TagValue::colored(text, TagColor::Refused)),
        CoordinationStatus::None => None,
    }
}

/// The compact exit-flight-level field.
///
/// Shows the matched rule's XFL while the clearance has not reached it,
/// blanks once it has, and falls back to the filed final level.
/// `destination_claimed` suppresses the final level for destinations a
/// loaded sector claims even without a concrete rule match (see
/// [`destination_claimed`]).
pub fn xfl_tag(
    facts: &FlightFacts,
    rule: Option<&CoordinationRule>,
    coordination: Option<&CoordinationState>,
    destination_claimed: bool,
) -> TagValue {
    if !is_loa_eligible(facts) {
        return TagValue::blank();
    }
    if let Some(tag) = coordinated_altitude_tag(coordination) {
        return tag;
    }

    let cleared = facts.cleared_altitude_ft;
    let final_ft = facts.final_altitude_ft;

    if let Some(rule) = rule {
        let xfl_ft = rule.exit_flight_level * 100;
        let arrival = rule.is_destination_anchored();

        if arrival && cleared <= xfl_ft {
            return TagValue::blank();
        }
        if (!arrival && cleared < xfl_ft && final_ft > xfl_ft) || (arrival && cleared > xfl_ft) {
            return TagValue::plain(rule.exit_flight_level.to_string());
        }
        if cleared == xfl_ft || cleared == final_ft {
            return TagValue::blank();
        }
        return TagValue::plain((final_ft / 100).to_string());
    }

    if destination_claimed && cleared < final_ft {
        return TagValue::blank();
    }
    if cleared == final_ft {
        TagValue::blank()
    } else {
        TagValue::plain((final_ft / 100).to_string())
    }
}

/// The detailed exit-flight-level field: same policy as [`xfl_tag`] but
/// with an "XFL" placeholder instead of blanks.
pub fn xfl_detailed_tag(
    facts: &FlightFacts,
    rule: Option<&CoordinationRule>,
    coordination: Option<&CoordinationState>,
) -> TagValue {
    if !is_loa_eligible(facts) {
        return TagValue::plain("XFL");
    }
    if let Some(tag) = coordinated_altitude_tag(coordination) {
        return tag;
    }

    let cleared = facts.cleared_altitude_ft;
    let final_ft = facts.final_altitude_ft;

    if let Some(rule) = rule {
        let xfl_ft = rule.exit_flight_level * 100;
        let arrival = rule.is_destination_anchored();

        if arrival && cleared < xfl_ft {
            return TagValue::plain("XFL");
        }
        if (!arrival && cleared < xfl_ft && final_ft > xfl_ft) || (arrival && cleared > xfl_ft) {
            return TagValue::plain(rule.exit_flight_level.to_string());
        }
        if cleared == final_ft {
            return TagValue::plain((final_ft / 100).to_string());
        }
        if cleared == xfl_ft {
            return TagValue::plain(rule.exit_flight_level.to_string());
        }
    }

    TagValue::plain((final_ft / 100).to_string())
}

/// The change-over-point field: coordinated point first, then the
/// matched rule's hand-off text, then the no-agreement sentinel.
pub fn cop_tag(
    facts: &FlightFacts,
    rule: Option<&CoordinationRule>,
    coordination: Option<&CoordinationState>,
) -> TagValue {
    if !is_loa_eligible(facts) {
        return TagValue::plain(NO_AGREEMENT_TEXT);
    }

    if let Some(state) = coordination {
        if let Some(point) = state.exit_point.as_deref() {
            match state.exit_point_status {
                CoordinationStatus::Accepted => {
                    return TagValue::colored(point, TagColor::Accepted)
                }
                CoordinationStatus::RequestedByMe => {
                    return TagValue::colored(point, TagColor::RequestFromMe)
                }
                CoordinationStatus::RequestedByOther => {
                    return TagValue::colored(point, TagColor::RequestToMe)
                }
                CoordinationStatus::Refused => {
                    return TagValue::colored(NO_AGREEMENT_TEXT, TagColor::Refused)
                }
                CoordinationStatus::None => {}
            }
        }
    }

    match rule {
        Some(rule) if !rule.handoff_text.is_empty() => TagValue::plain(&rule.handoff_text),
        _ => TagValue::plain(NO_AGREEMENT_TEXT),
    }
}

/// The planned-entry-level field: shows the matched XFL only when the
/// hand-off actually concerns a sector I own or control.
pub fn pel_tag(
    facts: &FlightFacts,
    rule: Option<&CoordinationRule>,
    coordination: Option<&CoordinationState>,
    table: &SectorOwnershipTable,
    my_sector: &str,
    online: &OnlineSnapshot,
) -> TagValue {
    if !is_loa_eligible(facts) {
        return TagValue::plain("PEL");
    }
    if let Some(tag) = coordinated_altitude_tag(coordination) {
        return tag;
    }

    if let Some(rule) = rule {
        for next in &rule.next_sectors {
            let statically_owned = table.owns(my_sector, next);
            let i_control = table
                .resolve_controller(next, online)
                .is_some_and(|c| c.eq_ignore_ascii_case(my_sector));
            if statically_owned || i_control {
                return TagValue::plain(format!("{:03}", rule.exit_flight_level));
            }
        }
    }

    TagValue::plain("PEL")
}

/// The next-sector field: the rule's preferred downstream sector, shown
/// only while it is staffed and the clearance is still short of the XFL
/// crossing.
pub fn next_sector_tag(
    facts: &FlightFacts,
    rule: Option<&CoordinationRule>,
    online: &OnlineSnapshot,
) -> TagValue {
    if let Some(rule) = rule {
        let cleared = facts.cleared_altitude_ft;
        let final_ft = facts.final_altitude_ft;
        let xfl_ft = rule.exit_flight_level * 100;
        let crossing = if rule.is_destination_anchored() {
            cleared > xfl_ft
        } else {
            (cleared < xfl_ft && final_ft > xfl_ft) || cleared > xfl_ft
        };
        if crossing {
            if let Some(next) = rule.next_sectors.first() {
                if online.contains(next) {
                    return TagValue::plain(next);
                }
            }
        }
    }
    TagValue::plain("-")
}

/// Whether a destination is claimed by a loaded sector even without a
/// rule match: either through a declared area of responsibility or
/// through a destination rule handing off into a sector I statically
/// own. Used to blank the XFL field instead of showing a misleading
/// final level.
pub fn destination_claimed(
    store: &RuleStore,
    table: &SectorOwnershipTable,
    my_sector: &str,
    destination: &str,
) -> bool {
    if store.destination_in_aor(destination) {
        return true;
    }
    store.rules_in(RuleCategory::Destination).any(|(_, rule)| {
        rule.destination.matches(destination)
            && rule
                .next_sectors
                .iter()
                .any(|next| table.owns(my_sector, next))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightPlanState, LoaConfig, OwnershipConfig, RuleSpec};

    fn arrival_rule(xfl: i32) -> CoordinationRule {
        let spec: RuleSpec = serde_json::from_str(&format!(
            r#"{{"destinations": ["EDDF"], "waypoints": ["ANEKI"], "nextSectors": ["EDYY"], "xfl": {xfl}, "copText": "ANEKI"}}"#
        ))
        .unwrap();
        CoordinationRule::from_spec(&spec, "DKB", RuleCategory::Destination)
    }

    fn facts(cleared: i32, final_ft: i32) -> FlightFacts {
        FlightFacts::new("DLH4CK", "EDDM", "EDDF")
            .with_route(["ANEKI"])
            .with_altitudes(cleared, final_ft)
    }

    #[test]
    fn test_xfl_blank_while_arrival_clearance_at_or_below_xfl() {
        let rule = arrival_rule(340);
        let tag = xfl_tag(&facts(34_000, 36_000), Some(&rule), None, false);
        assert_eq!(tag.text, "");
    }

    #[test]
    fn test_xfl_shows_level_while_arrival_cleared_above() {
        let rule = arrival_rule(340);
        let tag = xfl_tag(&facts(36_000, 36_000), Some(&rule), None, false);
        assert_eq!(tag.text, "340");
    }

    #[test]
    fn test_xfl_irrelevant_state_is_blank() {
        let rule = arrival_rule(340);
        let f = facts(36_000, 36_000).with_state(FlightPlanState::NonConcerned);
        assert_eq!(xfl_tag(&f, Some(&rule), None, false).text, "");
    }

    #[test]
    fn test_xfl_claimed_destination_suppresses_final_level() {
        let tag = xfl_tag(&facts(30_000, 36_000), None, None, true);
        assert_eq!(tag.text, "");
        let tag = xfl_tag(&facts(30_000, 36_000), None, None, false);
        assert_eq!(tag.text, "360");
    }

    #[test]
    fn test_xfl_detailed_placeholder_below_crossing() {
        let rule = arrival_rule(340);
        let tag = xfl_detailed_tag(&facts(32_000, 36_000), Some(&rule), None);
        assert_eq!(tag.text, "XFL");
    }

    #[test]
    fn test_coordinated_altitude_overrides_rule() {
        let rule = arrival_rule(340);
        let coordination = CoordinationState {
            exit_altitude_ft: Some(32_000),
            exit_altitude_status: CoordinationStatus::RequestedByMe,
            ..Default::default()
        };
        let tag = xfl_tag(&facts(36_000, 36_000), Some(&rule), Some(&coordination), false);
        assert_eq!(tag.text, "320");
        assert_eq!(tag.color, TagColor::RequestFromMe);
    }

    #[test]
    fn test_cop_shows_handoff_text_or_sentinel() {
        let rule = arrival_rule(340);
        assert_eq!(cop_tag(&facts(0, 0), Some(&rule), None).text, "ANEKI");
        assert_eq!(cop_tag(&facts(0, 0), None, None).text, NO_AGREEMENT_TEXT);
    }

    #[test]
    fn test_cop_accepted_point_keeps_showing() {
        let coordination = CoordinationState {
            exit_point: Some("SPESA".to_string()),
            exit_point_status: CoordinationStatus::Accepted,
            ..Default::default()
        };
        let tag = cop_tag(&facts(0, 0), None, Some(&coordination));
        assert_eq!(tag.text, "SPESA");
        assert_eq!(tag.color, TagColor::Accepted);
    }

    #[test]
    fn test_pel_shows_xfl_only_for_owned_or_controlled_next() {
        let ownership: OwnershipConfig =
            serde_json::from_str(r#"{"ownership": {"DKB": ["EDYY"]}}"#).unwrap();
        let table = SectorOwnershipTable::from_config(&ownership);
        let rule = arrival_rule(340);
        let online = OnlineSnapshot::default();

        let tag = pel_tag(&facts(30_000, 36_000), Some(&rule), None, &table, "DKB", &online);
        assert_eq!(tag.text, "340");

        let other_table = SectorOwnershipTable::default();
        let tag = pel_tag(
            &facts(30_000, 36_000),
            Some(&rule),
            None,
            &other_table,
            "DKB",
            &online,
        );
        assert_eq!(tag.text, "PEL");
    }

    #[test]
    fn test_next_sector_requires_online_controller() {
        let rule = arrival_rule(340);
        let f = facts(36_000, 36_000);

        let online = OnlineSnapshot::new(["EDYY"]);
        assert_eq!(next_sector_tag(&f, Some(&rule), &online).text, "EDYY");

        let offline = OnlineSnapshot::default();
        assert_eq!(next_sector_tag(&f, Some(&rule), &offline).text, "-");
    }

    #[test]
    fn test_destination_claimed_by_aor_or_owned_handoff() {
        let config: LoaConfig = serde_json::from_str(
            r#"{"DKB": {
                "destinationLoas": [{"destinations": ["EDDF"], "nextSectors": ["EID"], "waypoints": ["ANEKI"]}],
                "aorAirports": ["EDDS"]
            }}"#,
        )
        .unwrap();
        let ownership: OwnershipConfig =
            serde_json::from_str(r#"{"ownership": {"DKB": ["EID"]}}"#).unwrap();
        let table = SectorOwnershipTable::from_config(&ownership);
        let mut store = RuleStore::default();
        store.reload("DKB", &table, &config);

        assert!(destination_claimed(&store, &table, "DKB", "EDDS"));
        assert!(destination_claimed(&store, &table, "DKB", "EDDF"));
        assert!(!destination_claimed(&store, &table, "DKB", "LFPG"));
    }
}
