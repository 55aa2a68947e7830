// tests/integration_tests.rs
use actix_web::{test, web, App};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use grade_genie::annotator::{Annotator, BannerFont};
use grade_genie::api::{configure_routes, AppState};
use grade_genie::config::{AppConfig, FileConfig};
use grade_genie::errors::{GraderError, Result};
use grade_genie::providers::{PaperImage, VisionProvider};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Answers from a fixed script and remembers every prompt it saw.
struct ScriptedProvider {
    answers: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(answers: Vec<Result<String>>) -> Self {
        Self { answers: Mutex::new(answers.into()), prompts: Mutex::new(Vec::new()) }
    }
}

impl VisionProvider for ScriptedProvider {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _image: &PaperImage,
        _temperature: f32,
    ) -> Result<(String, u64)> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GraderError::EmptyResponse));
        answer.map(|text| (text, 5))
    }
}

fn page_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([250, 250, 250])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn test_state(provider: ScriptedProvider) -> AppState<ScriptedProvider> {
    let config = AppConfig::from_sources(FileConfig::default(), |key| {
        (key == "GEMINI_API_KEY").then(|| "test-key".to_string())
    })
    .unwrap();
    AppState::with_provider(config, provider, Annotator::new(BannerFont::Bitmap))
}

macro_rules! grading_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure_routes::<ScriptedProvider>),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_check() {
    let app = grading_app!(test_state(ScriptedProvider::new(vec![])));
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_grades_json_batch_in_order() {
    let state = test_state(ScriptedProvider::new(vec![
        Ok("GRADE: 85/100\nFEEDBACK: Good work".to_string()),
        Ok("Nice job overall.".to_string()),
    ]));
    let provider = Arc::clone(&state.provider);
    let app = grading_app!(state);

    let first = STANDARD.encode(page_png(320, 160));
    let second = format!("data:image/png;base64,{}", STANDARD.encode(page_png(200, 300)));

    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .set_json(json!({"images": [first, second], "instructions": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["grades"],
        json!([
            {"grade": "85/100", "feedback": "Good work"},
            {"grade": "N/A", "feedback": "Nice job overall."}
        ])
    );

    let graded = body["graded_images"].as_array().unwrap();
    assert_eq!(graded.len(), 2);
    let expected_sizes = [(320, 160), (200, 300)];
    for (url, (w, h)) in graded.iter().zip(expected_sizes) {
        let encoded = url.as_str().unwrap().strip_prefix("data:image/jpeg;base64,").unwrap();
        let decoded = image::load_from_memory(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (w, h));
    }

    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Additional Instructions from Teacher: None"));
}

#[actix_web::test]
async fn test_empty_images_is_bad_request() {
    let app = grading_app!(test_state(ScriptedProvider::new(vec![])));

    for payload in [json!({"images": [], "instructions": "Be strict"}), json!({})] {
        let req = test::TestRequest::post()
            .uri("/api/grade/")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"success": false, "error": "No images provided"}));
    }
}

#[actix_web::test]
async fn test_failure_returns_no_graded_images() {
    let state = test_state(ScriptedProvider::new(vec![
        Ok("GRADE: 10/10\nFEEDBACK: Great".to_string()),
        Err(GraderError::ApiError { status: 429, body: "quota".to_string() }),
    ]));
    let provider = Arc::clone(&state.provider);
    let app = grading_app!(state);

    let image = STANDARD.encode(page_png(100, 100));
    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .set_json(json!({"images": [image.clone(), image.clone(), image], "instructions": "x"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Error grading paper 1: API request failed with status 429: quota"
    );
    assert!(body.get("graded_images").is_none());
    assert_eq!(provider.prompts.lock().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_bad_base64_is_server_error() {
    let app = grading_app!(test_state(ScriptedProvider::new(vec![])));

    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .set_json(json!({"images": ["data:image/png;base64,@@@@"]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Server error: Invalid base64 image data"), "{}", error);
}

#[actix_web::test]
async fn test_malformed_json_is_server_error() {
    let app = grading_app!(test_state(ScriptedProvider::new(vec![])));

    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"images\": [")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Server error: Failed to parse JSON"));
}

#[actix_web::test]
async fn test_multipart_file_upload() {
    let state = test_state(ScriptedProvider::new(vec![Ok(
        "GRADE: 18/20\nFEEDBACK: Nearly there".to_string(),
    )]));
    let provider = Arc::clone(&state.provider);
    let app = grading_app!(state);

    let boundary = "----gradegenieboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"instructions\"\r\n\r\nOut of 20\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"paper.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(&page_png(240, 120));
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["grades"], json!([{"grade": "18/20", "feedback": "Nearly there"}]));
    assert_eq!(body["graded_images"].as_array().unwrap().len(), 1);

    let prompts = provider.prompts.lock().unwrap();
    assert!(prompts[0].contains("Additional Instructions from Teacher: Out of 20"));
}

#[actix_web::test]
async fn test_empty_file_input_is_not_a_paper() {
    let app = grading_app!(test_state(ScriptedProvider::new(vec![])));

    let boundary = "----gradegenieboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"instructions\"\r\n\r\nOut of 20\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"success": false, "error": "No images provided"}));
}

#[actix_web::test]
async fn test_urlencoded_form_is_graded() {
    let state = test_state(ScriptedProvider::new(vec![Ok(
        "GRADE: B\nFEEDBACK: Solid".to_string(),
    )]));
    let provider = Arc::clone(&state.provider);
    let app = grading_app!(state);

    let form = [
        ("images", format!("data:image/png;base64,{}", STANDARD.encode(page_png(150, 90)))),
        ("instructions", "Letter grades".to_string()),
    ];
    let req = test::TestRequest::post()
        .uri("/api/grade")
        .set_form(form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["grades"], json!([{"grade": "B", "feedback": "Solid"}]));

    let prompts = provider.prompts.lock().unwrap();
    assert!(prompts[0].contains("Additional Instructions from Teacher: Letter grades"));
}

#[actix_web::test]
async fn test_tiff_scan_is_graded() {
    let app = grading_app!(test_state(ScriptedProvider::new(vec![Ok(
        "GRADE: 3/5\nFEEDBACK: Legible scan".to_string(),
    )])));

    let mut tiff = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(180, 240, image::Rgb([240, 240, 240])))
        .write_to(&mut Cursor::new(&mut tiff), ImageFormat::Tiff)
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/grade/")
        .set_json(json!({"images": [STANDARD.encode(tiff)]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    let url = body["graded_images"][0].as_str().unwrap();
    let jpeg = STANDARD.decode(url.strip_prefix("data:image/jpeg;base64,").unwrap()).unwrap();
    let graded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((graded.width(), graded.height()), (180, 240));
}
