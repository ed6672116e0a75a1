//! Pure transforms from API payloads to flat records.

use crate::error::NormalizeError;
use crate::models::*;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

pub const CM_PER_FOOT: f64 = 30.48;
pub const CM_PER_INCH: f64 = 2.54;

/// Kept at 0.453 (not 0.4536) so stored weights stay comparable across runs.
pub const KG_PER_POUND: f64 = 0.453;

/// Parse a `F' I"` height into centimeters
pub fn height_to_cm(height: &str) -> Result<f64, NormalizeError> {
    let invalid = || NormalizeError::Height { value: height.to_string() };

    let (feet, inches) = height.split_once('\'').ok_or_else(invalid)?;
    let feet: u32 = feet.trim().parse().map_err(|_| invalid())?;
    let inches: u32 =
        inches.trim().trim_end_matches('"').trim().parse().map_err(|_| invalid())?;

    Ok(f64::from(feet) * CM_PER_FOOT + f64::from(inches) * CM_PER_INCH)
}

/// Pounds to kilograms, rounded to two decimals
///
/// Rounds the exact value of the product (half to even), so `215 lb` gives
/// `97.39` and not `97.4`.
pub fn pounds_to_kg(pounds: f64) -> f64 {
    let kg = pounds * KG_PER_POUND;
    Decimal::from_f64_retain(kg)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .map(|d| d.mantissa() as f64 / 10f64.powi(d.scale() as i32))
        .unwrap_or(kg)
}

/// Parse an `MM:SS` time-on-ice string into seconds. Minutes may exceed 59.
pub fn toi_to_seconds(toi: &str) -> Result<i32, NormalizeError> {
    let invalid = || NormalizeError::TimeOnIce { value: toi.to_string() };

    let (minutes, seconds) = toi.split_once(':').ok_or_else(invalid)?;
    let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
    let seconds: u32 = seconds.trim().parse().map_err(|_| invalid())?;

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .and_then(|total| i32::try_from(total).ok())
        .ok_or_else(invalid)
}

fn optional_toi(toi: Option<&str>, player_id: i32, season: &str) -> Option<i32> {
    toi.and_then(|raw| match toi_to_seconds(raw) {
        Ok(seconds) => Some(seconds),
        Err(e) => {
            warn!("Player {} season {}: {}", player_id, season, e);
            None
        }
    })
}

pub fn normalize_team(team: ApiTeam) -> Team {
    Team {
        team_id: team.id,
        name: team.name,
        arena_name: team.venue.name,
        arena_city: team.venue.city,
        abbr: team.abbreviation,
        location: team.location_name,
        initial_year: team.first_year_of_play,
        division_name: team.division.name,
        conference_name: team.conference.name,
        active: team.active,
    }
}

/// Fails only when a required field (height) is malformed
pub fn normalize_player(
    player_id: i32,
    team_id: i32,
    person: ApiPerson,
) -> Result<Player, NormalizeError> {
    Ok(Player {
        player_id,
        team_id,
        fname: person.first_name,
        lname: person.last_name,
        number: person.primary_number,
        birthdate: person.birth_date,
        birth_city: person.birth_city,
        birth_country: person.birth_country,
        nationality: person.nationality,
        height_cm: height_to_cm(&person.height)?,
        weight_kg: pounds_to_kg(person.weight),
        handedness: person.shoots_catches,
        captain: person.captain,
        alternate: person.alternate_captain,
        position: person.primary_position.code,
        active: person.active,
        rookie: person.rookie,
    })
}

pub fn normalize_season(player_id: i32, split: StatSplit) -> SeasonStat {
    let stat = split.stat;
    let pp_toi_seconds =
        optional_toi(stat.power_play_time_on_ice.as_deref(), player_id, &split.season);
    let sh_toi_seconds =
        optional_toi(stat.short_handed_time_on_ice.as_deref(), player_id, &split.season);

    SeasonStat {
        player_id,
        season: split.season,
        league_name: split.league.name,
        goals: stat.goals,
        assists: stat.assists,
        team_id: split.team.and_then(|t| t.id),
        pim: stat.pim,
        shots: stat.shots,
        games: stat.games,
        pp_goals: stat.power_play_goals,
        pp_points: stat.power_play_points,
        pp_toi_seconds,
        gwg: stat.game_winning_goals,
        ot_goals: stat.over_time_goals,
        sh_goals: stat.short_handed_goals,
        sh_points: stat.short_handed_points,
        sh_toi_seconds,
        plus_minus: stat.plus_minus,
        shifts: stat.shifts,
        blocked: stat.blocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_height_to_cm() {
        assert_close(height_to_cm("6' 2\"").unwrap(), 187.96);
        assert_close(height_to_cm("6'2\"").unwrap(), 187.96);
        assert_close(height_to_cm("5' 11\"").unwrap(), 5.0 * 30.48 + 11.0 * 2.54);
        assert_close(height_to_cm("7' 0\"").unwrap(), 213.36);
    }

    #[test]
    fn test_height_formula_holds_across_range() {
        for feet in 4..=7 {
            for inches in 0..12 {
                let cm = height_to_cm(&format!("{feet}' {inches}\"")).unwrap();
                assert_close(cm, f64::from(feet) * 30.48 + f64::from(inches) * 2.54);
            }
        }
    }

    #[test]
    fn test_malformed_height_is_an_error() {
        for bad in ["", "6", "6-2", "188 cm", "six' two\"", "6' \""] {
            assert_eq!(
                height_to_cm(bad),
                Err(NormalizeError::Height { value: bad.to_string() }),
                "{bad:?} should fail"
            );
        }
    }

    #[test]
    fn test_pounds_to_kg() {
        assert_eq!(pounds_to_kg(200.0), 90.6);
        assert_eq!(pounds_to_kg(193.0), 87.43);
        assert_eq!(pounds_to_kg(0.0), 0.0);
    }

    #[test]
    fn test_pounds_to_kg_rounds_exact_product() {
        // Each product sits just below a half cent in binary
        assert_eq!(pounds_to_kg(215.0), 97.39);
        assert_eq!(pounds_to_kg(225.0), 101.92);
        assert_eq!(pounds_to_kg(115.0), 52.09);
        assert_eq!(pounds_to_kg(315.0), 142.69);
    }

    #[test]
    fn test_toi_to_seconds() {
        assert_eq!(toi_to_seconds("2:30"), Ok(150));
        assert_eq!(toi_to_seconds("00:00"), Ok(0));
        assert_eq!(toi_to_seconds("245:10"), Ok(245 * 60 + 10));
        assert!(toi_to_seconds("2.30").is_err());
        assert!(toi_to_seconds(":30").is_err());
        assert!(toi_to_seconds("").is_err());
    }

    #[test]
    fn test_oversized_toi_is_an_error() {
        assert_eq!(
            toi_to_seconds("99999999:00"),
            Err(NormalizeError::TimeOnIce { value: "99999999:00".to_string() })
        );
        assert!(toi_to_seconds("35791394:08").is_err());
        assert_eq!(toi_to_seconds("35791394:07"), Ok(i32::MAX));
    }

    fn person(overrides: serde_json::Value) -> ApiPerson {
        let mut raw = json!({
            "firstName": "Auston",
            "lastName": "Matthews",
            "primaryNumber": "34",
            "birthDate": "1997-09-17",
            "birthCity": "San Ramon",
            "birthCountry": "USA",
            "nationality": "USA",
            "height": "6' 3\"",
            "weight": 208,
            "active": true,
            "rookie": false,
            "shootsCatches": "L",
            "primaryPosition": { "code": "C" }
        });
        for (key, value) in overrides.as_object().unwrap() {
            raw[key] = value.clone();
        }
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_normalize_player() {
        let person = person(json!({ "alternateCaptain": true }));
        let player = normalize_player(8479318, 10, person).unwrap();

        assert_eq!(player.player_id, 8479318);
        assert_eq!(player.team_id, 10);
        assert_eq!(player.fname, "Auston");
        assert_eq!(player.number, Some(34));
        assert_close(player.height_cm, 6.0 * 30.48 + 3.0 * 2.54);
        assert_eq!(player.weight_kg, 94.22);
        assert_eq!(player.handedness, "L");
        assert_eq!(player.position, "C");
        assert_eq!(player.captain, None);
        assert_eq!(player.alternate, Some(true));
    }

    #[test]
    fn test_normalize_player_rejects_bad_height() {
        let err = normalize_player(1, 1, person(json!({ "height": "190cm" }))).unwrap_err();
        assert!(matches!(err, NormalizeError::Height { .. }));
    }

    #[test]
    fn test_normalize_season_scalars() {
        let split: StatSplit = serde_json::from_value(json!({
            "season": "20182019",
            "league": { "name": "National Hockey League" },
            "team": { "id": 10, "name": "Toronto Maple Leafs" },
            "stat": {
                "goals": 37, "assists": 36, "pim": 8, "shots": 228, "games": 68,
                "powerPlayGoals": 12, "powerPlayPoints": 22, "powerPlayTimeOnIce": "175:43",
                "gameWinningGoals": 6, "overTimeGoals": 2,
                "shortHandedGoals": 0, "shortHandedPoints": 0, "shortHandedTimeOnIce": "2:30",
                "plusMinus": 17, "shifts": 1493, "blocked": 39
            }
        }))
        .unwrap();

        let stat = normalize_season(8479318, split);
        assert_eq!(stat.player_id, 8479318);
        assert_eq!(stat.season, "20182019");
        assert_eq!(stat.league_name, "National Hockey League");
        assert_eq!(stat.team_id, Some(10));
        assert_eq!(stat.goals, Some(37));
        assert_eq!(stat.pp_toi_seconds, Some(175 * 60 + 43));
        assert_eq!(stat.sh_toi_seconds, Some(150));
        assert_eq!(stat.gwg, Some(6));
        assert_eq!(stat.ot_goals, Some(2));
        assert_eq!(stat.plus_minus, Some(17));
        assert_eq!(stat.blocked, Some(39));
    }

    #[test]
    fn test_normalize_season_defaults_missing_to_none() {
        let split: StatSplit = serde_json::from_value(json!({
            "season": "20142015",
            "league": { "name": "WJC-A" },
            "team": { "name": "Canada" },
            "stat": {
                "goals": 3,
                "powerPlayTimeOnIce": "garbage",
                "shortHandedTimeOnIce": "99999999:00"
            }
        }))
        .unwrap();

        let stat = normalize_season(1, split);
        assert_eq!(stat.goals, Some(3));
        assert_eq!(stat.team_id, None);
        assert_eq!(stat.assists, None);
        assert_eq!(stat.pp_toi_seconds, None);
        assert_eq!(stat.sh_toi_seconds, None);
        assert_eq!(stat.shifts, None);
    }
}
