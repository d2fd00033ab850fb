mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{voter, voter_roll};
use petition_validator::{
    core::jurisdiction::County,
    matcher::{RegistrantQuery, VoterMatcher, VoterRoll},
};

fn query(first: &str, last: &str, street: &str) -> RegistrantQuery {
    RegistrantQuery {
        first_name: first.to_string(),
        last_name: last.to_string(),
        street_name: street.to_string(),
    }
}

#[tokio::test]
async fn names_match_by_prefix_and_street_by_substring() {
    let roll = voter_roll(&[(
        County::Kings,
        voter("NY1", "JONATHAN", "MARTINEZ", "18", "WEST FLATBUSH AVE", "52"),
    )])
    .await;

    let found = roll
        .find_registrants(County::Kings, &query("jon", "mart", "flatbush"), 1)
        .await
        .expect("lookup");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].state_voter_id, "NY1");
    assert_eq!(found[0].address, "18 WEST FLATBUSH AVE, Brooklyn 11201");
    assert_eq!(found[0].assembly_district.as_deref(), Some("52"));

    // suffixes are not prefixes
    let missed = roll
        .find_registrants(County::Kings, &query("athan", "MARTINEZ", ""), 1)
        .await
        .expect("lookup");
    assert!(missed.is_empty());
}

#[tokio::test]
async fn lookups_stay_inside_the_county_partition() {
    let roll = voter_roll(&[(
        County::Queens,
        voter("NY2", "ANA", "RUIZ", "40", "GRAND ST", "30"),
    )])
    .await;

    let elsewhere = roll
        .find_registrants(County::Bronx, &query("Ana", "Ruiz", "Grand"), 1)
        .await
        .expect("lookup");
    assert!(elsewhere.is_empty());
    let home = roll
        .find_registrants(County::Queens, &query("Ana", "Ruiz", "Grand"), 1)
        .await
        .expect("lookup");
    assert_eq!(home.len(), 1);
}

#[tokio::test]
async fn first_inserted_registrant_wins() {
    let roll = voter_roll(&[
        (County::NewYork, voter("NY3", "MARY", "LEE", "1", "BROADWAY", "66")),
        (County::NewYork, voter("NY4", "MARYANNE", "LEEDS", "2", "BROADWAY", "66")),
    ])
    .await;

    let found = roll
        .find_registrants(County::NewYork, &query("Mary", "Lee", "broad"), 1)
        .await
        .expect("lookup");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].state_voter_id, "NY3");

    let both = roll
        .find_registrants(County::NewYork, &query("Mary", "Lee", "broad"), 5)
        .await
        .expect("lookup");
    assert_eq!(both.len(), 2);
}

#[tokio::test]
async fn wildcards_in_ocr_text_are_literal() {
    let roll = voter_roll(&[(
        County::Kings,
        voter("NY5", "JANE", "SMITH", "123", "MAIN ST", "52"),
    )])
    .await;

    let found = roll
        .find_registrants(County::Kings, &query("%", "_MITH", ""), 1)
        .await
        .expect("lookup");
    assert!(found.is_empty());
}

#[tokio::test]
async fn registrant_can_be_fetched_by_state_id() {
    let roll = voter_roll(&[(
        County::Richmond,
        voter("NY6", "LUIS", "PEREZ", "5", "BAY ST", "61"),
    )])
    .await;

    let found = roll
        .find_by_state_voter_id(County::Richmond, "NY6")
        .await
        .expect("lookup");
    assert_eq!(found.map(|voter| voter.last_name), Some("PEREZ".to_string()));
    assert!(roll
        .find_by_state_voter_id(County::Kings, "NY6")
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn matcher_routes_by_borough_keyword() {
    let roll = voter_roll(&[
        (County::Richmond, voter("SI1", "LUIS", "PEREZ", "5", "BAY ST", "61")),
        (County::NewYork, voter("MN1", "LUIS", "PEREZ", "5", "BAY ST", "74")),
    ])
    .await;
    let matcher = VoterMatcher::new(Arc::new(roll), Duration::from_secs(1));

    let staten = matcher
        .find_match("Luis Perez", "5 Bay St, STATEN ISLAND NY")
        .await
        .expect("lookup")
        .expect("match");
    assert_eq!(staten.state_voter_id, "SI1");

    let manhattan = matcher
        .find_match("Luis Perez", "5 Bay St, New York NY")
        .await
        .expect("lookup")
        .expect("match");
    assert_eq!(manhattan.state_voter_id, "MN1");

    let by_id = matcher
        .find_by_state_voter_id(County::Richmond, "SI1")
        .await
        .expect("lookup");
    assert_eq!(by_id.map(|voter| voter.assembly_district), Some(Some("61".to_string())));
}

#[tokio::test]
async fn address_without_street_number_matches_any_street() {
    let roll = voter_roll(&[(
        County::Bronx,
        voter("BX1", "ROSA", "DIAZ", "900", "GRAND CONCOURSE", "77"),
    )])
    .await;
    let matcher = VoterMatcher::new(Arc::new(roll), Duration::from_secs(1));

    let found = matcher
        .find_match("Rosa Diaz", "Grand Concourse, Bronx")
        .await
        .expect("lookup");
    assert_eq!(found.map(|voter| voter.state_voter_id), Some("BX1".to_string()));
}
