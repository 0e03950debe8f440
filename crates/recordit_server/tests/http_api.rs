//! HTTP-level tests for the recordit router.
//!
//! The service runs over `MemoryStore`, so these need no database.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::HeaderMap;
use axum::Router;
use http_body_util::BodyExt;
use hyper::{header, Request, StatusCode};
use recordit_core::attachments::{AttachmentStore, DEFAULT_EXTENSIONS};
use recordit_core::memory::MemoryStore;
use recordit_core::password::hash_password;
use recordit_core::ports::{CourseStore, ReportStore, Stores, UserStore};
use recordit_core::roles::Role;
use recordit_core::service::RecordService;
use recordit_core::settings::ServiceSettings;
use recordit_core::types::{CourseView, NewCourse, NewReport, NewUser, ReportView, User};
use recordit_server::middleware::jwt::JwtConfig;
use recordit_server::router::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Test app builder ───────────────────────────────────────────

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";
const PASSWORD: &str = "recordit";
const BODY_LIMIT: usize = 4 * 1024;

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    jwt: JwtConfig,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let settings = ServiceSettings {
            log_dir: tmp.path().join("logs"),
            ..ServiceSettings::default()
        };
        let attachments =
            AttachmentStore::new(tmp.path().join("uploads"), DEFAULT_EXTENSIONS.iter().copied());
        let service = Arc::new(RecordService::new(
            Stores::from_single(store.clone()),
            settings,
            attachments,
        ));
        service.init_roles().await.unwrap();
        service.ensure_admin().await.unwrap();

        let jwt = JwtConfig::from_secret(TEST_JWT_SECRET);
        let app = build_router(service, jwt.clone(), BODY_LIMIT);
        Self {
            app,
            store,
            jwt,
            _tmp: tmp,
        }
    }

    async fn user(&self, number: &str, role: Role) -> User {
        self.store
            .insert_user(NewUser {
                number: number.into(),
                name: format!("N{}", &number[number.len() - 4..]),
                password_hash: hash_password(PASSWORD).unwrap(),
                remark: None,
                role,
            })
            .await
            .unwrap()
    }

    async fn course(&self, teacher: &User, grade: i32) -> CourseView {
        self.store
            .insert_course(NewCourse {
                teacher_id: teacher.id,
                name: "Seminar".into(),
                grade,
                remark: None,
            })
            .await
            .unwrap()
    }

    async fn report(&self, course: &CourseView, reporter: &User) -> ReportView {
        self.store
            .insert_report(NewReport {
                course_id: course.course.id,
                reporter_id: reporter.id,
                name: "Week one".into(),
                remark: None,
            })
            .await
            .unwrap()
    }

    fn fresh(&self, user: &User) -> String {
        self.jwt.session_token(user.id).unwrap()
    }

    fn stale(&self, user: &User) -> String {
        self.jwt.remember_token(user.id).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>, HeaderMap) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body, headers)
    }

    async fn json(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body, _) = self.send(req).await;
        // axum's own rejections (e.g. 413) are plain text
        let value = serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
        (status, value)
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_bytes(uri: &str, token: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap()
}

fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

// ── Public routes ──────────────────────────────────────────────

#[tokio::test]
async fn health_and_about_are_public() {
    let t = TestApp::new().await;
    let (status, body) = t.json(get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let teacher = t.user("1001", Role::Teacher).await;
    t.course(&teacher, 2016).await;
    let (status, body) = t.json(get("/about", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teacher_count"], 1);
    assert_eq!(body["course_count"], 1);
    assert_eq!(body["report_count"], 0);
}

// ── Authentication ─────────────────────────────────────────────

#[tokio::test]
async fn login_issues_fresh_and_remember_tokens() {
    let t = TestApp::new().await;
    let (status, body) = t
        .json(post_json(
            "/auth/login",
            None,
            json!({ "username": "007", "password": PASSWORD, "remember_me": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["number"], "007");
    assert_eq!(body["expires_in"], 180);
    assert!(body["user"].get("password_hash").is_none());

    let session = t.jwt.verify(body["token"].as_str().unwrap()).unwrap();
    assert!(session.fresh);
    let remember = t.jwt.verify(body["remember_token"].as_str().unwrap()).unwrap();
    assert!(!remember.fresh);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let t = TestApp::new().await;
    let (status, body) = t
        .json(post_json(
            "/auth/login",
            None,
            json!({ "username": "007", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password.");
    assert_eq!(body["status"], 401);

    let (status, _) = t
        .json(post_json(
            "/auth/login",
            None,
            json!({ "username": "999", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let t = TestApp::new().await;
    let (status, body) = t.json(get("/user", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please log in to access this page.");

    let (status, _) = t.json(get("/user", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = JwtConfig::from_secret(b"someone-else").session_token(1).unwrap();
    let (status, _) = t.json(get("/user", Some(&foreign))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_of_a_deleted_user_is_rejected() {
    let t = TestApp::new().await;
    let student = t.user("201600000001", Role::Student).await;
    let token = t.fresh(&student);
    t.store.delete_user(student.id).await.unwrap();
    let (status, _) = t.json(get("/user", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn re_authentication_refreshes_a_remembered_login() {
    let t = TestApp::new().await;
    let admin = t.store.find_user_by_number("007").await.unwrap().unwrap();
    let stale = t.stale(&admin);

    let (status, _) = t.json(get("/admin", Some(&stale))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .json(post_json(
            "/auth/re-authenticate",
            Some(&stale),
            json!({ "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["token"].as_str().unwrap().to_string();

    let (status, body) = t.json(get("/admin", Some(&fresh))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin_count"], 1);
}

// ── Admin area ─────────────────────────────────────────────────

#[tokio::test]
async fn students_cannot_enter_the_admin_area() {
    let t = TestApp::new().await;
    let student = t.user("201600000001", Role::Student).await;
    let (status, _) = t.json(get("/admin", Some(&t.fresh(&student)))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn teachers_cannot_manage_users() {
    let t = TestApp::new().await;
    let teacher = t.user("1001", Role::Teacher).await;
    let (status, _) = t
        .json(get("/admin/manage/user", Some(&t.fresh(&teacher))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.json(get("/admin", Some(&t.fresh(&teacher)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["course_count"], 0);
}

#[tokio::test]
async fn admin_registers_and_lists_users() {
    let t = TestApp::new().await;
    let admin = t.store.find_user_by_number("007").await.unwrap().unwrap();
    let token = t.fresh(&admin);

    let (status, body) = t
        .json(post_json(
            "/admin/manage/user/register/teacher",
            Some(&token),
            json!({
                "username": "1001",
                "name": "Ada",
                "password": PASSWORD,
                "password2": PASSWORD,
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "Teacher");

    let (status, _) = t
        .json(post_json(
            "/admin/manage/user/register/teacher",
            Some(&token),
            json!({
                "username": "1001",
                "name": "Ada again",
                "password": PASSWORD,
                "password2": PASSWORD,
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = t
        .json(get("/admin/manage/user?filter=teacher", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["number"], "1001");

    let (status, _) = t
        .json(get("/admin/manage/user?page=9", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_batch_registration_reports_each_row() {
    let t = TestApp::new().await;
    let admin = t.store.find_user_by_number("007").await.unwrap().unwrap();
    t.user("201600000001", Role::Student).await;
    let sheet = "number,name,role,remark,password\n\
                 201600000001,Taken,Student,,recordit\n\
                 201600000002,Fresh,Student,,recordit\n\
                 42,Boss,Administrator,,recordit\n";

    let (status, body) = t
        .json(post_bytes(
            "/admin/manage/user/register/batch",
            &t.fresh(&admin),
            sheet.as_bytes().to_vec(),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["created"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0], "201600000001 is already existed.");
    assert_eq!(body["errors"][1], "42 role should be 'Student' or 'Teacher'.");
}

#[tokio::test]
async fn admin_cannot_delete_themself() {
    let t = TestApp::new().await;
    let admin = t.store.find_user_by_number("007").await.unwrap().unwrap();
    let (status, body) = t
        .json(post_json(
            &format!("/admin/manage/user/{}/delete", admin.id),
            Some(&t.fresh(&admin)),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You cannot delete yourself.");
}

#[tokio::test]
async fn teacher_adds_a_course_and_switches_it() {
    let t = TestApp::new().await;
    let teacher = t.user("1001", Role::Teacher).await;
    let token = t.fresh(&teacher);

    let (status, body) = t
        .json(post_json(
            "/admin/manage/course/add",
            Some(&token),
            json!({ "name": "Compilers", "grade": 2016 }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["teacher_number"], "1001");
    let course_id = body["id"].as_i64().unwrap();

    let (status, body) = t
        .json(post_json(
            &format!("/admin/manage/course/{course_id}/switch-state"),
            Some(&token),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let other = t.user("1002", Role::Teacher).await;
    let (status, _) = t
        .json(post_json(
            &format!("/admin/manage/course/{course_id}/switch-state"),
            Some(&t.fresh(&other)),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn report_for_a_student_of_another_grade_is_rejected() {
    let t = TestApp::new().await;
    let teacher = t.user("1001", Role::Teacher).await;
    t.user("201700000001", Role::Student).await;
    let course = t.course(&teacher, 2016).await;

    let (status, body) = t
        .json(post_json(
            &format!("/admin/manage/report/{}/add", course.course.id),
            Some(&t.fresh(&teacher)),
            json!({ "number": "201700000001", "name": "Week one" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "The reporter does not belong to this course.");
}

// ── Review flow ────────────────────────────────────────────────

#[tokio::test]
async fn review_upload_and_download_flow() {
    let t = TestApp::new().await;
    let teacher = t.user("1001", Role::Teacher).await;
    let reporter = t.user("201600000001", Role::Student).await;
    let reviewer = t.user("201600000002", Role::Student).await;
    let course = t.course(&teacher, 2016).await;
    let report = t.report(&course, &reporter).await;
    let student = t.fresh(&reviewer);

    // The feed shows the report to classmates but not to the reporter.
    let (status, body) = t.json(get("/user", Some(&student))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["greeting"], "Welcome~ N0002");
    assert_eq!(body["reports"]["total"], 1);
    let (_, body) = t.json(get("/user", Some(&t.fresh(&reporter)))).await;
    assert_eq!(body["reports"]["total"], 0);

    // Uploading before reviewing is refused.
    let upload_uri = format!("/user/review/{}/file?filename=notes.pdf", report.report.id);
    let (status, _) = t
        .json(post_bytes(&upload_uri, &student, b"%PDF-1.4".to_vec()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let review_uri = format!("/user/review/{}", report.report.id);
    let (status, body) = t
        .json(post_json(&review_uri, Some(&student), json!({ "score": 101 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "The score out of range from 0 to 100.");

    let (status, body) = t
        .json(post_json(
            &review_uri,
            Some(&student),
            json!({ "score": 90, "remark": "clear" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["score"], 90);

    let (status, body) = t
        .json(post_bytes(&upload_uri, &student, b"%PDF-1.4".to_vec()))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let stored = body["file"].as_str().unwrap().to_string();
    assert!(stored.ends_with(".pdf"));

    let (status, body) = t.json(get(&review_uri, Some(&student))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["score"], 90);
    assert_eq!(body["score_upper"], 100);

    // The teacher downloads the attachment and the report's records.
    let teacher_token = t.fresh(&teacher);
    let (status, bytes, headers) = t
        .send(get(
            &format!("/admin/manage/record-table/file/{stored}"),
            Some(&teacher_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"%PDF-1.4");
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");

    let (status, bytes, headers) = t
        .send(get(
            &format!("/admin/manage/record-table/{}/download", report.report.id),
            Some(&teacher_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"records.zip\""
    );
    let names = zip_names(&bytes);
    assert!(names.contains(&"records.csv".to_string()));
    assert!(names.contains(&format!("uploads/{stored}")));

    let (status, body) = t
        .json(get(
            &format!("/admin/manage/record-table/{}", report.report.id),
            Some(&teacher_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["reviewer_number"], "201600000002");
}

#[tokio::test]
async fn students_cannot_review_their_own_report() {
    let t = TestApp::new().await;
    let teacher = t.user("1001", Role::Teacher).await;
    let reporter = t.user("201600000001", Role::Student).await;
    let course = t.course(&teacher, 2016).await;
    let report = t.report(&course, &reporter).await;

    let (status, _) = t
        .json(post_json(
            &format!("/user/review/{}", report.report.id),
            Some(&t.fresh(&reporter)),
            json!({ "score": 100 }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let t = TestApp::new().await;
    let teacher = t.user("1001", Role::Teacher).await;
    let reporter = t.user("201600000001", Role::Student).await;
    let reviewer = t.user("201600000002", Role::Student).await;
    let course = t.course(&teacher, 2016).await;
    let report = t.report(&course, &reporter).await;

    let (status, _) = t
        .json(post_bytes(
            &format!("/user/review/{}/file?filename=big.zip", report.report.id),
            &t.fresh(&reviewer),
            vec![0u8; BODY_LIMIT * 2],
        ))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ── Settings and logs ──────────────────────────────────────────

#[tokio::test]
async fn own_password_change_requires_the_old_password() {
    let t = TestApp::new().await;
    let student = t.user("201600000001", Role::Student).await;
    let token = t.fresh(&student);

    let (status, body) = t
        .json(post_json(
            "/user/settings/change-password",
            Some(&token),
            json!({
                "old_password": "not-my-password",
                "password": "brand-new-pass",
                "password2": "brand-new-pass",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Old password is incorrect.");

    let (status, _) = t
        .json(post_json(
            "/user/settings/change-password",
            Some(&token),
            json!({
                "old_password": PASSWORD,
                "password": "brand-new-pass",
                "password2": "brand-new-pass",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t
        .json(post_json(
            "/auth/login",
            None,
            json!({ "username": "201600000001", "password": "brand-new-pass" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_log_download_is_a_zip() {
    let t = TestApp::new().await;
    let admin = t.store.find_user_by_number("007").await.unwrap().unwrap();
    let token = t.fresh(&admin);
    let (status, _) = t.json(get("/admin", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, bytes, headers) = t
        .send(get("/admin/manage/logs/user", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(zip_names(&bytes), vec!["user_logs.csv".to_string()]);
}
