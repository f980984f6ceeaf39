use base64::{engine::general_purpose::STANDARD, Engine as _};
use httpmock::prelude::*;
use httpmock::prelude::HttpMockRequest;
use image::{Rgba, RgbaImage};
use masked_inpaint::inpaint::{
    codec, CompositeOutcome, EditSession, HttpInpaintService, InpaintRequest, InpaintService,
    Mask, Mode, Rect, SubmitError,
};
use masked_inpaint::settings::{ServiceSettings, Settings};
use serde_json::{json, Value};

fn service_settings(server: &MockServer) -> ServiceSettings {
    ServiceSettings {
        endpoint: server.url("/inpaint"),
        api_key_env: None,
        timeout_seconds: 10,
    }
}

fn red_png(width: u32, height: u32) -> Vec<u8> {
    codec::encode_rgba_png(&RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255])))
        .expect("encode red")
}

fn request_json(req: &HttpMockRequest) -> Option<Value> {
    serde_json::from_slice(req.body.as_deref()?).ok()
}

/// The 32x32 session below selects an 8x8 block; the uploaded mask must match.
fn carries_8x8_block_mask(req: &HttpMockRequest) -> bool {
    let Some(body) = request_json(req) else {
        return false;
    };
    let Some(mask) = body["mask"]
        .as_str()
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|png| Mask::decode(&png).ok())
    else {
        return false;
    };
    mask.dimensions() == (32, 32) && mask.replace_pixel_count() == 64
}

fn has_no_mask_field(req: &HttpMockRequest) -> bool {
    request_json(req).is_some_and(|body| body.get("mask").is_none())
}

#[test]
fn manual_submission_sends_mask_and_composites_response() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/inpaint")
            .header("content-type", "application/json")
            .json_body_partial(
                json!({ "mode": "manual", "instruction": Mode::Manual.instruction() }).to_string(),
            )
            .matches(carries_8x8_block_mask);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "image": STANDARD.encode(red_png(64, 64)) }));
    });
    let service = HttpInpaintService::new(&service_settings(&server)).expect("client");

    let original = RgbaImage::from_pixel(32, 32, Rgba([10, 20, 30, 255]));
    let mut session = EditSession::new(original, &Settings::default());
    session.select_mode(Mode::Manual);
    session.add_rect(Rect::new(8.0, 8.0, 8.0, 8.0));

    let result = session.submit(&service).expect("submit");
    mock.assert();

    assert_eq!(result.outcome, CompositeOutcome::Composited);
    let out = result.processed_image().expect("decode output");
    assert_eq!(out.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
    assert_eq!(out.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
}

#[test]
fn auto_request_has_no_mask_field() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/inpaint")
            .json_body_partial(
                json!({ "mode": "auto", "image": STANDARD.encode(red_png(4, 4)) }).to_string(),
            )
            .matches(has_no_mask_field);
        then.status(200)
            .json_body(json!({ "image": STANDARD.encode(red_png(4, 4)) }));
    });
    let service = HttpInpaintService::new(&service_settings(&server)).expect("client");

    let request = InpaintRequest {
        mode: Mode::Auto,
        image_png: red_png(4, 4),
        mask_png: None,
    };
    let bytes = service.inpaint(&request).expect("inpaint");

    mock.assert();
    assert_eq!(bytes, red_png(4, 4));
}

#[test]
fn api_key_is_sent_as_bearer_token() {
    std::env::set_var("MASKED_INPAINT_TEST_TOKEN", "s3cret");
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/inpaint")
            .header("authorization", "Bearer s3cret");
        then.status(200)
            .json_body(json!({ "image": STANDARD.encode(red_png(2, 2)) }));
    });
    let mut settings = service_settings(&server);
    settings.api_key_env = Some("MASKED_INPAINT_TEST_TOKEN".into());
    let service = HttpInpaintService::new(&settings).expect("client");

    let request = InpaintRequest {
        mode: Mode::Tiled,
        image_png: red_png(2, 2),
        mask_png: None,
    };
    service.inpaint(&request).expect("inpaint");
    mock.assert();
}

#[test]
fn missing_api_key_variable_fails_client_construction() {
    let settings = ServiceSettings {
        endpoint: "http://127.0.0.1:9/inpaint".into(),
        api_key_env: Some("MASKED_INPAINT_TEST_TOKEN_THAT_IS_NOT_SET".into()),
        timeout_seconds: 10,
    };
    assert!(HttpInpaintService::new(&settings).is_err());
}

#[test]
fn server_error_surfaces_as_service_failure() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/inpaint");
        then.status(500).body(r#"{"error":"model overloaded"}"#);
    });
    let service = HttpInpaintService::new(&service_settings(&server)).expect("client");

    let mut session = EditSession::new(RgbaImage::new(16, 16), &Settings::default());
    session.select_mode(Mode::Manual);
    session.add_rect(Rect::new(0.0, 0.0, 8.0, 8.0));

    let err = session.submit(&service).expect_err("service failure");
    mock.assert();

    assert!(matches!(err, SubmitError::Service(_)));
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("model overloaded"));
    assert!(!session.is_submitting());
}

#[test]
fn error_payload_with_success_status_is_a_failure() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/inpaint");
        then.status(200)
            .json_body(json!({ "error": "quota exceeded" }));
    });
    let service = HttpInpaintService::new(&service_settings(&server)).expect("client");

    let request = InpaintRequest {
        mode: Mode::Auto,
        image_png: red_png(2, 2),
        mask_png: None,
    };
    let err = service.inpaint(&request).expect_err("error payload");
    mock.assert();
    assert!(format!("{err:#}").contains("quota exceeded"));
}
