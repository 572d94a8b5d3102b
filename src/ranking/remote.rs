//! HTTP ranking client (browser only)
//!
//! Both requests are POSTs with a JSON body. They are started together and
//! awaited independently, so one failing never hides the other.

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestCache, RequestInit, RequestMode, Response};

use super::{RankingError, RankingReport, ScoreSubmission, leaderboard_request, parse_leaderboard, parse_submit_response};

fn js_error(value: JsValue) -> RankingError {
    RankingError::Network(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn post_json(url: &str, body: &str) -> Result<JsFuture, RankingError> {
    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_cache(RequestCache::NoCache);
    opts.set_body(&JsValue::from_str(body));

    let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;
    request
        .headers()
        .set("Content-Type", "application/json")
        .map_err(js_error)?;

    let window = web_sys::window().ok_or_else(|| RankingError::Network("no window".to_string()))?;
    Ok(JsFuture::from(window.fetch_with_request(&request)))
}

async fn read_body(pending: Result<JsFuture, RankingError>) -> Result<String, RankingError> {
    let response: Response = pending?.await.map_err(js_error)?.dyn_into().map_err(js_error)?;
    if !response.ok() {
        return Err(RankingError::Network(format!("HTTP {}", response.status())));
    }
    let text = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    text.as_string().ok_or(RankingError::UnexpectedResponse)
}

/// Submit the score and fetch the leaderboard from `url`
pub async fn submit_and_fetch(url: &str, submission: &ScoreSubmission) -> RankingReport {
    let send = submission
        .to_json()
        .and_then(|body| post_json(url, &body));
    let fetch = post_json(url, &leaderboard_request());

    let submitted = read_body(send)
        .await
        .and_then(|body| parse_submit_response(&body));
    if let Err(e) = &submitted {
        log::warn!("Score submission failed: {e}");
    }

    let leaderboard = read_body(fetch).await.and_then(|body| parse_leaderboard(&body));
    if let Err(e) = &leaderboard {
        log::warn!("Leaderboard load failed: {e}");
    }

    RankingReport { submitted, leaderboard }
}
