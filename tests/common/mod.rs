#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use petition_validator::{
    core::{config::EngineConfig, jurisdiction::County, types::PageUpload},
    db::{
        repositories::voters::{SqliteVoterRoll, VoterRecord},
        Database,
    },
    extraction::{FieldExtractor, ScriptedExtractor},
    matcher::VoterRoll,
    AppState,
};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 400x600 ruled sheet with `rows` signature rows, each 50px tall and
/// starting at y=250, with a handwritten-looking block in every signature cell.
pub fn ruled_sheet(rows: u32) -> RgbaImage {
    assert!(rows <= 6, "sheet holds at most six rows");
    let mut image = RgbaImage::from_pixel(400, 600, WHITE);
    for line in 0..=rows {
        let y = 250 + line * 50;
        for x in 0..400 {
            image.put_pixel(x, y, BLACK);
        }
    }
    for row in 0..rows {
        let top = 250 + row * 50;
        for y in (top + 15)..(top + 35) {
            for x in 130..190 {
                image.put_pixel(x, y, BLACK);
            }
        }
    }
    image
}

pub fn blank_sheet() -> RgbaImage {
    RgbaImage::from_pixel(400, 600, WHITE)
}

pub fn png_bytes(image: RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn upload(page_number: u32, image: RgbaImage) -> PageUpload {
    PageUpload {
        page_number,
        image: png_bytes(image),
    }
}

pub fn voter(
    state_voter_id: &str,
    first_name: &str,
    last_name: &str,
    street_number: &str,
    street_name: &str,
    assembly_district: &str,
) -> VoterRecord {
    VoterRecord {
        state_voter_id: state_voter_id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        street_number: street_number.to_string(),
        street_name: street_name.to_string(),
        city: "Brooklyn".to_string(),
        zip_code: "11201".to_string(),
        assembly_district: Some(assembly_district.to_string()),
        senate_district: Some("25".to_string()),
        congressional_district: Some("10".to_string()),
        enrolled_party: Some("DEM".to_string()),
    }
}

pub async fn voter_roll(voters: &[(County, VoterRecord)]) -> SqliteVoterRoll {
    let roll = SqliteVoterRoll::in_memory().await.expect("voter roll");
    for (county, record) in voters {
        roll.insert_voter(*county, record)
            .await
            .expect("insert voter");
    }
    roll
}

pub async fn state_with_roll(
    extractor: impl FieldExtractor + 'static,
    roll: Arc<dyn VoterRoll>,
) -> AppState {
    let db = Database::in_memory().await.expect("db should initialize");
    AppState::new(db, EngineConfig::default(), roll, Arc::new(extractor))
}

pub async fn state_with(
    extractor: ScriptedExtractor,
    voters: &[(County, VoterRecord)],
) -> AppState {
    let roll = voter_roll(voters).await;
    state_with_roll(extractor, Arc::new(roll)).await
}
