use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::*;
use crate::scrape::ScrapeOutcome;
use crate::services::{DashboardCounts, DepartmentStat};
use crate::state::AppState;
use crate::store::schema::DEPARTMENTS;

const DEFAULT_LOG_LIMIT: u32 = 20;

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Deserialize)]
struct LogParams {
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct AssignmentRequest {
    faculty_id: i64,
    #[serde(default)]
    semester: Option<String>,
    #[serde(default)]
    academic_year: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeRequest {
    url: String,
}

#[derive(Serialize)]
struct DirectoryView {
    faculty: Vec<FacultyListing>,
    departments: Vec<Department>,
}

type Created<T> = (StatusCode, Json<T>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/directory", get(directory))
        .route("/dashboard", get(dashboard))
        .route("/faculty", get(list_faculty).post(create_faculty))
        .route(
            "/faculty/{id}",
            get(get_faculty).patch(update_faculty).delete(delete_faculty),
        )
        .route("/faculty/{id}/profile", get(faculty_profile))
        .route("/faculty/{id}/courses", get(faculty_courses))
        .route("/faculty/{id}/publications", get(faculty_publications))
        .route("/departments", get(list_departments).post(create_department))
        .route("/departments/stats", get(department_stats))
        .route(
            "/departments/{id}",
            get(get_department)
                .patch(update_department)
                .delete(delete_department),
        )
        .route("/departments/{id}/faculty", get(department_faculty))
        .route("/departments/{id}/courses", get(department_courses))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route("/courses/{id}/assignments", post(assign_course))
        .route("/publications", get(list_publications).post(create_publication))
        .route(
            "/publications/{id}",
            get(get_publication)
                .patch(update_publication)
                .delete(delete_publication),
        )
        .route("/offices", get(list_offices).post(create_office))
        .route("/offices/{id}", get(get_office))
        .route("/scrape", post(scrape))
        .route("/scrape/logs", get(scrape_logs))
        .with_state(state)
}

fn deleted(removed: bool) -> Result<StatusCode, AppError> {
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.directory.stats.try_count(DEPARTMENTS).await?;
    Ok(StatusCode::OK)
}

async fn directory(State(state): State<AppState>) -> Json<DirectoryView> {
    let (faculty, departments) = tokio::join!(
        state.directory.faculty.get_all(),
        state.directory.departments.get_all(),
    );
    Json(DirectoryView {
        faculty,
        departments,
    })
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardCounts> {
    Json(state.directory.stats.dashboard_counts().await)
}

// faculty

async fn list_faculty(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<FacultyListing>> {
    let faculty = match params.q {
        Some(q) => state.directory.faculty.search(&q).await,
        None => state.directory.faculty.get_all().await,
    };
    Json(faculty)
}

async fn create_faculty(
    State(state): State<AppState>,
    Json(req): Json<NewFaculty>,
) -> Result<Created<Faculty>, AppError> {
    let faculty = state.directory.faculty.create(&req).await?;
    Ok((StatusCode::CREATED, Json(faculty)))
}

async fn get_faculty(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FacultyListing>, AppError> {
    let faculty = state
        .directory
        .faculty
        .get_by_id(id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(faculty))
}

async fn update_faculty(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<FacultyPatch>,
) -> Result<Json<Faculty>, AppError> {
    Ok(Json(state.directory.faculty.update(id, &req).await?))
}

async fn delete_faculty(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.directory.faculty.delete(id).await?)
}

async fn faculty_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FacultyProfile>, AppError> {
    let profile = state
        .directory
        .faculty
        .get_profile(id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(profile))
}

async fn faculty_courses(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<Vec<CourseAssignment>> {
    Json(state.directory.courses.get_by_faculty(id).await)
}

async fn faculty_publications(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<Vec<Publication>> {
    Json(state.directory.publications.get_by_faculty(id).await)
}

// departments

async fn list_departments(State(state): State<AppState>) -> Json<Vec<Department>> {
    Json(state.directory.departments.get_all().await)
}

async fn create_department(
    State(state): State<AppState>,
    Json(req): Json<NewDepartment>,
) -> Result<Created<Department>, AppError> {
    let department = state.directory.departments.create(&req).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

async fn department_stats(State(state): State<AppState>) -> Json<Vec<DepartmentStat>> {
    Json(state.directory.stats.department_statistics().await)
}

async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Department>, AppError> {
    let department = state
        .directory
        .departments
        .get_by_id(id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(department))
}

async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<DepartmentPatch>,
) -> Result<Json<Department>, AppError> {
    Ok(Json(state.directory.departments.update(id, &req).await?))
}

async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.directory.departments.delete(id).await?)
}

async fn department_faculty(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<Vec<FacultyListing>> {
    Json(state.directory.faculty.get_by_department(id).await)
}

async fn department_courses(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<Vec<CourseListing>> {
    Json(state.directory.courses.get_by_department(id).await)
}

// courses

async fn list_courses(State(state): State<AppState>) -> Json<Vec<CourseListing>> {
    Json(state.directory.courses.get_all().await)
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourse>,
) -> Result<Created<Course>, AppError> {
    let course = state.directory.courses.create(&req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CourseListing>, AppError> {
    let course = state
        .directory
        .courses
        .get_by_id(id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CoursePatch>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(state.directory.courses.update(id, &req).await?))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.directory.courses.delete(id).await?)
}

async fn assign_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AssignmentRequest>,
) -> Result<Created<FacultyCourse>, AppError> {
    let assignment = state
        .directory
        .courses
        .assign_to_faculty(
            req.faculty_id,
            id,
            req.semester.as_deref(),
            req.academic_year.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

// publications

async fn list_publications(State(state): State<AppState>) -> Json<Vec<PublicationListing>> {
    Json(state.directory.publications.get_all().await)
}

async fn create_publication(
    State(state): State<AppState>,
    Json(req): Json<NewPublication>,
) -> Result<Created<Publication>, AppError> {
    let publication = state.directory.publications.create(&req).await?;
    Ok((StatusCode::CREATED, Json(publication)))
}

async fn get_publication(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicationListing>, AppError> {
    let publication = state
        .directory
        .publications
        .get_by_id(id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(publication))
}

async fn update_publication(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PublicationPatch>,
) -> Result<Json<Publication>, AppError> {
    Ok(Json(state.directory.publications.update(id, &req).await?))
}

async fn delete_publication(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.directory.publications.delete(id).await?)
}

// offices

async fn list_offices(State(state): State<AppState>) -> Json<Vec<Office>> {
    Json(state.directory.offices.get_all().await)
}

async fn create_office(
    State(state): State<AppState>,
    Json(req): Json<NewOffice>,
) -> Result<Created<Office>, AppError> {
    let office = state.directory.offices.create(&req).await?;
    Ok((StatusCode::CREATED, Json(office)))
}

async fn get_office(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Office>, AppError> {
    let office = state
        .directory
        .offices
        .get_by_id(id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(office))
}

// scraping

async fn scrape(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<ScrapeOutcome>, AppError> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("url is required".to_string()));
    }
    Ok(Json(state.scraper.scrape(url).await))
}

async fn scrape_logs(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> Json<Vec<ScrapeLog>> {
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Json(state.directory.scrape_logs.recent(limit).await)
}
