use reqwest::header::COOKIE;
use scraper::{
    Html,
    Selector,
};
use tracing::debug;

use super::JpdbClient;
use crate::core::{
    http::{
        ensure_success,
        REVIEW_TIMEOUT,
    },
    Ease,
    ReviewGrade,
    SyncError,
    VocabularyRef,
};

const REVIEW_NUMBER_INPUT: &str = r#"form[action^="/review"] input[type=hidden][name=r]"#;

/// Pulls the hidden review number out of the pre-review page. The answer
/// request is rejected without it.
pub fn scrape_review_number(html: &str) -> Result<u64, SyncError> {
    let selector = Selector::parse(REVIEW_NUMBER_INPUT)
        .map_err(|e| SyncError::unexpected("/review", format!("bad selector: {e:?}")))?;
    let document = Html::parse_document(html);

    let input = document.select(&selector).next().ok_or(SyncError::ReviewTokenMissing)?;
    let value = input.value().attr("value").ok_or(SyncError::ReviewTokenMissing)?;

    value.trim().parse().map_err(|_| SyncError::InvalidReviewToken(value.to_string()))
}

impl JpdbClient {
    fn review_page(&self, url: &str, session: &str) -> Result<String, SyncError> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .header(COOKIE, format!("sid={session}"))
            .timeout(REVIEW_TIMEOUT)
            .send()?;
        ensure_success(&resp)?;
        Ok(resp.text()?)
    }

    pub fn review(&self, vocab: VocabularyRef, ease: Ease) -> Result<ReviewGrade, SyncError> {
        let session = self.session_token()?;
        let key = urlencoding::encode(&vocab.review_key()).into_owned();
        let pre_review_url = self.url(&format!("/review?c={key}"));

        let page = self.review_page(&pre_review_url, session)?;
        let review_no = scrape_review_number(&page)?;

        let grade = ease.grade();
        let review_url = format!("{pre_review_url}&r={review_no}&g={}", grade.code());
        self.review_page(&review_url, session)?;

        debug!("Reviewed vid {} sid {} with grade {}", vocab.vid, vocab.sid, grade.code());
        Ok(grade)
    }
}
