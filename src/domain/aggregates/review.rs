//! Review entity, owned 1:1 by a completed booking

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;
use crate::domain::value_objects::Rating;

#[derive(Clone, Debug, Serialize)]
pub struct Review {
    pub(crate) id: Uuid,
    pub(crate) booking_id: Uuid,
    pub(crate) customer_id: Uuid,
    pub(crate) provider_id: Uuid,
    pub(crate) rating: Rating,
    pub(crate) comment: Option<String>,
    pub(crate) media_urls: Vec<String>,
    pub(crate) sentiment_score: Option<f64>,
    pub(crate) is_visible: bool,
    pub(crate) provider_response: Option<String>,
    pub(crate) responded_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(booking_id: Uuid, customer_id: Uuid, provider_id: Uuid, rating: Rating, comment: Option<String>, media_urls: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(), booking_id, customer_id, provider_id, rating, comment, media_urls,
            sentiment_score: None, is_visible: true, provider_response: None, responded_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn booking_id(&self) -> Uuid { self.booking_id }
    pub fn provider_id(&self) -> Uuid { self.provider_id }
    pub fn rating(&self) -> Rating { self.rating }
    pub fn comment(&self) -> Option<&str> { self.comment.as_deref() }
    pub fn sentiment_score(&self) -> Option<f64> { self.sentiment_score }

    pub fn attach_sentiment(&mut self, score: f64) { self.sentiment_score = Some(score); }

    /// One response per review, by the reviewed provider only.
    pub fn respond(&mut self, provider_id: Uuid, text: String) -> Result<(), ReviewError> {
        if provider_id != self.provider_id { return Err(ReviewError::NotReviewedProvider); }
        if self.provider_response.is_some() { return Err(ReviewError::AlreadyResponded); }
        self.provider_response = Some(text);
        self.responded_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Debug, Clone)] pub enum ReviewError { NotReviewedProvider, AlreadyResponded }
impl std::error::Error for ReviewError {}
impl fmt::Display for ReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReviewedProvider => write!(f, "only the reviewed provider may respond"),
            Self::AlreadyResponded => write!(f, "review already has a response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_single_shot() {
        let provider = Uuid::new_v4();
        let mut r = Review::new(Uuid::new_v4(), Uuid::new_v4(), provider, Rating::new(4).unwrap(), None, vec![]);
        r.respond(provider, "thank you!".into()).unwrap();
        assert!(matches!(r.respond(provider, "again".into()), Err(ReviewError::AlreadyResponded)));
    }

    #[test]
    fn response_rejects_other_providers() {
        let mut r = Review::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Rating::new(5).unwrap(), None, vec![]);
        assert!(matches!(r.respond(Uuid::new_v4(), "hi".into()), Err(ReviewError::NotReviewedProvider)));
    }
}
