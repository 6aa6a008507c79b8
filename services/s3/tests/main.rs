use std::env;

use emcsign_core::time::{from_timestamp, now};
use emcsign_core::{Body, Context, ErrorKind, OsEnv, Result};
use emcsign_http_send_reqwest::ReqwestHttpSend;
use emcsign_s3::{Client, Config};
use http::StatusCode;
use log::warn;

/// Returns the client and the bucket to test against.
fn init_client() -> Option<(Client, String)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("EMCSIGN_S3_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let bucket = env::var("EMCSIGN_S3_BUCKET").expect("EMCSIGN_S3_BUCKET must be set");
    let ctx = Context::new().with_env(OsEnv);
    let client = Client::new(ctx, Config::new(), ReqwestHttpSend::default())
        .expect("ECS_S3_ENDPOINT and credentials must be set");
    client.calibrate_clock().expect("clock calibration must succeed");
    Some((client, bucket))
}

#[test]
fn test_get_not_exist_object() -> Result<()> {
    let Some((client, bucket)) = init_client() else {
        warn!("EMCSIGN_S3_TEST is not set, skipped");
        return Ok(());
    };

    let req = http::Request::get(format!("/{bucket}/emcsign/not_exist_file")).body(Body::Empty)?;
    let err = client.execute(req).unwrap_err();
    assert_eq!(ErrorKind::Vendor, err.kind());
    assert_eq!(Some(StatusCode::NOT_FOUND), err.status());
    assert_eq!(Some("NoSuchKey"), err.vendor().and_then(|v| v.code.as_deref()));
    Ok(())
}

#[test]
fn test_put_and_presigned_get() -> Result<()> {
    let Some((client, bucket)) = init_client() else {
        warn!("EMCSIGN_S3_TEST is not set, skipped");
        return Ok(());
    };

    let path = format!("/{bucket}/emcsign/{}", now().timestamp_millis());
    let put = http::Request::put(&path)
        .header(http::header::CONTENT_TYPE, "text/plain")
        .header("x-amz-meta-owner", "emcsign")
        .body(Body::from("hello world"))?;
    assert_eq!(StatusCode::OK, client.execute(put)?.status());

    let expiration = from_timestamp(now().timestamp() + 600)?;
    let get = client.presign(http::Request::get(&path).body(())?, expiration)?;
    let content = client
        .execute_presigned(&get, Body::Empty)?
        .into_body()
        .collect()?;
    assert_eq!(content, "hello world");

    client.execute(http::Request::delete(&path).body(Body::Empty)?)?;
    Ok(())
}
