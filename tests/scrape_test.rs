use std::sync::Arc;

use faculty_directory::models::{NewDepartment, NewFaculty, NewOffice};
use faculty_directory::state::AppState;
use faculty_directory::store::SqliteStore;

const PAGE: &str = r#"
<section>
  <article class="faculty-card">
    <h2 class="faculty-name">Dr.  Rosalind   Franklin</h2>
    <p class="designation">Professor</p>
    <p class="email">R.Franklin@Uni.edu</p>
    <p class="phone">(555) 123-4567</p>
    <p class="department">CHEMISTRY</p>
    <a href="/staff/franklin">More</a>
  </article>
  <article class="faculty-card">
    <h2 class="faculty-name">Unlisted Person</h2>
    <p class="department">Chemistry</p>
  </article>
  <article class="faculty-card">
    <h2 class="faculty-name">Linus Pauling</h2>
    <p class="email">pauling@uni.edu</p>
    <p class="department">Alchemy</p>
  </article>
</section>
"#;

async fn state() -> AppState {
    let store = SqliteStore::connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");
    AppState::new(Arc::new(store)).expect("state")
}

#[tokio::test]
async fn import_stores_cards_with_email() {
    let state = state().await;
    let chemistry = state
        .directory
        .departments
        .create(&NewDepartment {
            department_name: "Chemistry".to_string(),
            hod_id: None,
        })
        .await
        .expect("department")
        .department_id;

    let count = state.scraper.import(PAGE, None).await.expect("import");
    assert_eq!(count, 2);

    let all = state.directory.faculty.get_all().await;
    assert_eq!(all.len(), 2);

    let rosalind = &all[0].faculty;
    assert_eq!(rosalind.name, "Dr. Rosalind Franklin");
    assert_eq!(rosalind.email.as_deref(), Some("r.franklin@uni.edu"));
    assert_eq!(rosalind.phone.as_deref(), Some("5551234567"));
    assert_eq!(rosalind.profile_link.as_deref(), Some("/staff/franklin"));
    assert_eq!(rosalind.department_id, Some(chemistry));

    let linus = &all[1].faculty;
    assert_eq!(linus.name, "Linus Pauling");
    assert_eq!(linus.department_id, None);
}

#[tokio::test]
async fn importing_twice_updates_in_place() {
    let state = state().await;
    state.scraper.import(PAGE, None).await.expect("first import");
    let changed = PAGE.replace("Professor", "Emerita");
    state.scraper.import(&changed, None).await.expect("second import");

    let all = state.directory.faculty.get_all().await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].faculty.designation.as_deref(), Some("Emerita"));
}

#[tokio::test]
async fn import_keeps_office_assignments() {
    let state = state().await;
    let office = state
        .directory
        .offices
        .create(&NewOffice {
            room_number: Some("3.14".to_string()),
            block: Some("Lab".to_string()),
            location: None,
        })
        .await
        .expect("office");
    let existing = state
        .directory
        .faculty
        .create(&NewFaculty {
            name: "R. Franklin".to_string(),
            email: Some("r.franklin@uni.edu".to_string()),
            office_id: Some(office.office_id),
            ..Default::default()
        })
        .await
        .expect("faculty");

    state.scraper.import(PAGE, None).await.expect("import");

    let read = state
        .directory
        .faculty
        .get_by_id(existing.faculty_id)
        .await
        .expect("still there");
    assert_eq!(read.faculty.name, "Dr. Rosalind Franklin");
    assert_eq!(read.faculty.office_id, Some(office.office_id));
}

#[tokio::test]
async fn page_without_emails_imports_nothing() {
    let state = state().await;
    let html = r#"<div class="faculty-card"><span class="faculty-name">Anon</span></div>"#;

    assert_eq!(state.scraper.import(html, None).await.expect("import"), 0);
    assert!(state.directory.faculty.get_all().await.is_empty());
}

#[tokio::test]
async fn failed_scrape_is_logged() {
    let state = state().await;

    let outcome = state.scraper.scrape("http://127.0.0.1:9/").await;
    assert!(!outcome.success);
    assert_eq!(outcome.count, 0);

    let logs = state.directory.scrape_logs.recent(5).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].records_updated, Some(0));
    assert_eq!(logs[0].error_message, outcome.error);
}
