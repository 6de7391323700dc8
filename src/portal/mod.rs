//! HTTP client for the course schedule portal.
//!
//! The portal is a pair of server-rendered pages: a landing page holding the
//! semester and course menus, and a display page answering a form POST with
//! the timetables of one course.

pub mod errors;

pub use errors::PortalError;

use crate::config::Config;
use crate::parser::CourseLink;
use crate::parser::menus::{COURSE_MENU, SEMESTER_MENU};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, trace};

/// Value the portal's own form submits when the keyword box is left untouched.
pub const SUBJECT_CODE_PLACEHOLDER: &str = "Enter Keywords or Course Code";

/// Fetches the raw course-query response for one link.
#[async_trait]
pub trait CourseFetcher: Send + Sync {
    async fn fetch_course(&self, link: &CourseLink) -> Result<Vec<u8>, PortalError>;
}

pub struct PortalClient {
    http: reqwest::Client,
    main_url: String,
    course_url: String,
}

impl PortalClient {
    pub fn new(config: &Config) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(PortalError::Client)?;

        Ok(Self {
            http,
            main_url: config.portal_main_url.clone(),
            course_url: config.portal_course_url.clone(),
        })
    }

    /// GET the landing page holding the semester and course menus.
    pub async fn fetch_main_page(&self) -> Result<Vec<u8>, PortalError> {
        let request = self.http.get(&self.main_url);
        self.read(request, &self.main_url).await
    }

    async fn read(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<Vec<u8>, PortalError> {
        let start = Instant::now();
        let response = request.send().await.map_err(|source| PortalError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                status,
                url: url.to_string(),
            });
        }

        // Decoded with the charset the response declares, UTF-8 otherwise.
        let body = response.text().await.map_err(|source| PortalError::Body {
            url: url.to_string(),
            source,
        })?;

        trace!(
            url,
            status = status.as_u16(),
            bytes = body.len(),
            duration = crate::utils::fmt_duration(start.elapsed()),
            "Portal response"
        );
        Ok(body.into_bytes())
    }
}

/// Form fields of a course query, in the order the portal's own form sends them.
pub fn course_form(link: &CourseLink) -> [(&'static str, &str); 6] {
    [
        (SEMESTER_MENU, link.semester.key.as_str()),
        (COURSE_MENU, link.course.key.as_str()),
        ("r_subj_code", SUBJECT_CODE_PLACEHOLDER),
        ("r_search_type", "F"),
        ("boption", "CLoad"),
        ("staff_access", "False"),
    ]
}

#[async_trait]
impl CourseFetcher for PortalClient {
    async fn fetch_course(&self, link: &CourseLink) -> Result<Vec<u8>, PortalError> {
        debug!(course_key = link.course.key.as_str(), "Querying course schedule");
        let request = self.http.post(&self.course_url).form(&course_form(link));
        self.read(request, &self.course_url).await
    }
}
