use crate::{
    aggregator::SavePage,
    core::{
        district::TargetDistrict,
        errors::{AppError, AppResult},
        types::{
            GetPetitionResponse, ListPetitionsResponse, ListSignaturesResponse, PageCommit,
            PageOutcome, SavePageRequest, SavePageResponse,
        },
    },
    db::repositories::{petitions, signatures},
    AppState,
};

pub async fn save_page(state: &AppState, request: SavePageRequest) -> AppResult<SavePageResponse> {
    let district = TargetDistrict::parse(&request.district);
    let required_signatures = request
        .required_signatures
        .or_else(|| district.default_required_signatures());
    let page = SavePage {
        petition_name: request.petition_name,
        district: district.to_string(),
        party: request.party,
        required_signatures,
        page_number: request.page_number,
        result: request.result,
    };

    let receipt = state.aggregator.save_page(&page).await?;
    let outcome = match receipt.commit {
        PageCommit::AlreadyCounted => PageOutcome::AlreadyCounted,
        PageCommit::Created | PageCommit::Counted => PageOutcome::for_result(&page.result),
    };
    Ok(SavePageResponse {
        receipt,
        message: outcome.message(),
        outcome,
    })
}

pub async fn list_petitions(state: &AppState) -> AppResult<ListPetitionsResponse> {
    let petitions = petitions::list_petitions(state.db.pool()).await?;
    Ok(ListPetitionsResponse { petitions })
}

pub async fn get_petition(state: &AppState, petition_id: String) -> AppResult<GetPetitionResponse> {
    let petition = petitions::get_petition(state.db.pool(), &petition_id).await?;
    Ok(GetPetitionResponse { petition })
}

pub async fn list_signatures(
    state: &AppState,
    petition_id: String,
    page_number: Option<i64>,
) -> AppResult<ListSignaturesResponse> {
    if let Some(page) = page_number.filter(|page| *page < 1) {
        return Err(AppError::InvalidInput(format!("invalid page number {page}")));
    }
    // 404 for an unknown petition rather than an empty list
    petitions::get_petition(state.db.pool(), &petition_id).await?;
    let signatures =
        signatures::list_signatures(state.db.pool(), &petition_id, page_number).await?;
    Ok(ListSignaturesResponse {
        petition_id,
        signatures,
    })
}
