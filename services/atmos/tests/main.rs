use std::env;

use emcsign_atmos::{Client, Config};
use emcsign_core::time::{from_timestamp, now};
use emcsign_core::{Body, Context, ErrorKind, OsEnv, Result};
use emcsign_http_send_reqwest::ReqwestHttpSend;
use http::StatusCode;
use log::{debug, warn};

fn init_client() -> Option<Client> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("EMCSIGN_ATMOS_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let ctx = Context::new().with_env(OsEnv);
    let client = Client::new(ctx, Config::new(), ReqwestHttpSend::default())
        .expect("ATMOS_ENDPOINT, ATMOS_UID and ATMOS_SECRET must be set");
    client.calibrate_clock().expect("clock calibration must succeed");
    Some(client)
}

#[test]
fn test_get_service() -> Result<()> {
    let Some(client) = init_client() else {
        warn!("EMCSIGN_ATMOS_TEST is not set, skipped");
        return Ok(());
    };

    let req = http::Request::get("/rest/service").body(Body::Empty)?;
    let resp = client.execute(req)?;
    assert_eq!(StatusCode::OK, resp.status());
    debug!("service info: {:?}", resp.into_body().collect()?);
    Ok(())
}

#[test]
fn test_get_not_exist_object() -> Result<()> {
    let Some(client) = init_client() else {
        warn!("EMCSIGN_ATMOS_TEST is not set, skipped");
        return Ok(());
    };

    let req = http::Request::get("/rest/namespace/emcsign/not_exist_file").body(Body::Empty)?;
    let err = client.execute(req).unwrap_err();
    assert_eq!(ErrorKind::Vendor, err.kind());
    assert_eq!(Some(StatusCode::NOT_FOUND), err.status());
    assert_eq!(Some(1003), err.vendor().and_then(|v| v.code_as_u32()));
    Ok(())
}

#[test]
fn test_presigned_put_and_get() -> Result<()> {
    let Some(client) = init_client() else {
        warn!("EMCSIGN_ATMOS_TEST is not set, skipped");
        return Ok(());
    };

    let path = format!("/rest/namespace/emcsign/{}", now().timestamp_millis());
    let expiration = from_timestamp(now().timestamp() + 600)?;

    let put = client.presign(
        http::Request::post(&path)
            .header(http::header::CONTENT_TYPE, "text/plain")
            .body(())?,
        expiration,
    )?;
    let resp = client.execute_presigned(&put, Body::from("hello world"))?;
    assert_eq!(StatusCode::CREATED, resp.status());

    let url = client.shareable_url(&path, expiration, None)?;
    debug!("shareable url: {url}");

    let get = client.presign(http::Request::get(&path).body(())?, expiration)?;
    let content = client
        .execute_presigned(&get, Body::Empty)?
        .into_body()
        .collect()?;
    assert_eq!(content, "hello world");

    let delete = http::Request::delete(&path).body(Body::Empty)?;
    client.execute(delete)?;
    Ok(())
}
