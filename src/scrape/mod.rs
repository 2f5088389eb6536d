//! Sample pipeline that fills the directory from a faculty listing page.
//!
//! The page is expected to hold one `.faculty-card` element per person with
//! `.faculty-name`, `.designation`, `.qualification`, `.email`, `.phone` and
//! `.department` children plus a profile link. Other layouts need their own
//! selectors.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::{NewFaculty, ScrapeStatus};
use crate::services::{DepartmentService, FacultyService, ScrapeLogService};

const CARD: &str = ".faculty-card";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text pulled from one card, before cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFaculty {
    pub name: String,
    pub designation: String,
    pub qualification: String,
    pub email: String,
    pub phone: String,
    pub profile_link: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeOutcome {
    pub success: bool,
    pub count: usize,
    pub error: Option<String>,
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::Unknown(format!("Bad selector {}: {}", css, e)))
}

fn child_text(card: &ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Extract every faculty card from a page. Relative profile links are
/// resolved against `base` when one is given.
pub fn parse_faculty_cards(html: &str, base: Option<&Url>) -> Result<Vec<RawFaculty>, AppError> {
    let card = selector(CARD)?;
    let name = selector(".faculty-name")?;
    let designation = selector(".designation")?;
    let qualification = selector(".qualification")?;
    let email = selector(".email")?;
    let phone = selector(".phone")?;
    let department = selector(".department")?;
    let link = selector("a[href]")?;

    let document = Html::parse_document(html);
    let cards = document
        .select(&card)
        .map(|el| {
            let href = el
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default()
                .trim();
            let profile_link = match base {
                Some(base) if !href.is_empty() => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                _ => href.to_string(),
            };

            RawFaculty {
                name: child_text(&el, &name),
                designation: child_text(&el, &designation),
                qualification: child_text(&el, &qualification),
                email: child_text(&el, &email),
                phone: child_text(&el, &phone),
                profile_link,
                department: child_text(&el, &department),
            }
        })
        .collect();

    Ok(cards)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Normalise one card into an insertable record.
///
/// Names get their whitespace collapsed, emails are lower-cased and phones keep
/// digits only. Departments are looked up by lower-cased name in
/// `departments`; unknown names leave the department unset.
pub fn clean(raw: RawFaculty, departments: &HashMap<String, i64>) -> NewFaculty {
    let name = raw.name.split_whitespace().collect::<Vec<_>>().join(" ");
    let phone = raw.phone.chars().filter(char::is_ascii_digit).collect::<String>();
    let department = raw.department.trim().to_lowercase();

    NewFaculty {
        name,
        designation: non_empty(raw.designation.trim().to_string()),
        qualification: non_empty(raw.qualification.trim().to_string()),
        email: non_empty(raw.email.trim().to_lowercase()),
        phone: non_empty(phone),
        profile_link: non_empty(raw.profile_link.trim().to_string()),
        department_id: departments.get(&department).copied(),
        office_id: None,
    }
}

#[derive(Clone)]
pub struct FacultyScraper {
    client: Client,
    faculty: FacultyService,
    departments: DepartmentService,
    scrape_logs: ScrapeLogService,
}

impl FacultyScraper {
    pub fn new(
        faculty: FacultyService,
        departments: DepartmentService,
        scrape_logs: ScrapeLogService,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            faculty,
            departments,
            scrape_logs,
        })
    }

    async fn fetch(&self, url: &str) -> Result<(Url, String), AppError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::RemoteUnavailable(format!(
                "Fetching {} returned {}",
                url, status
            )));
        }
        let final_url = response.url().clone();
        Ok((final_url, response.text().await?))
    }

    /// Parse, clean and store the cards found in `html`. Returns how many
    /// records were sent to the store.
    pub async fn import(&self, html: &str, base: Option<&Url>) -> Result<usize, AppError> {
        let cards = parse_faculty_cards(html, base)?;
        info!("Found {} faculty cards", cards.len());

        let departments = self.departments.try_name_index().await?;
        let records = cards
            .into_iter()
            .map(|raw| clean(raw, &departments))
            .filter(|record| record.email.is_some())
            .collect::<Vec<_>>();

        if records.is_empty() {
            return Ok(0);
        }

        let count = records.len();
        self.faculty.bulk_upsert(records).await?;
        Ok(count)
    }

    /// Scrape `url` into the directory and record the run in the scrape log.
    ///
    /// Never fails: problems are reported in the outcome and the log row.
    pub async fn scrape(&self, url: &str) -> ScrapeOutcome {
        info!("Scraping faculty from {}", url);

        let result = match self.fetch(url).await {
            Ok((base, html)) => self.import(&html, Some(&base)).await,
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(count) => ScrapeOutcome {
                success: true,
                count,
                error: None,
            },
            Err(e) => {
                error!("Scraping {} failed: {}", url, e);
                ScrapeOutcome {
                    success: false,
                    count: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        let status = if outcome.success {
            ScrapeStatus::Success
        } else {
            ScrapeStatus::Failed
        };
        if let Err(e) = self
            .scrape_logs
            .log_scrape(outcome.count as i64, status, outcome.error.as_deref())
            .await
        {
            warn!("Failed to record scrape run: {}", e);
        }

        outcome
    }
}
