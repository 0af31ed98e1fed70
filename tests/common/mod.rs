use actix_csrf_double_submit::{CsrfConfig, CsrfMiddleware, CsrfToken, DEFAULT_HEADER};
use actix_http::Request;
use actix_http::body::{BoxBody, EitherBody};
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::{App, HttpResponse, test, web};

pub async fn build_app(
    cfg: CsrfConfig,
) -> impl Service<Request, Response = ServiceResponse<EitherBody<BoxBody>>, Error = actix_web::Error>
{
    build_app_with(CsrfMiddleware::new(cfg)).await
}

pub async fn build_app_with(
    middleware: CsrfMiddleware,
) -> impl Service<Request, Response = ServiceResponse<EitherBody<BoxBody>>, Error = actix_web::Error>
{
    test::init_service(App::new().wrap(middleware).configure(configure_routes)).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/form",
        web::get().to(|csrf: CsrfToken| async move {
            HttpResponse::Ok().body(format!("token:{}", csrf.0))
        }),
    )
    .route(
        "/created",
        web::get().to(|| async move { HttpResponse::Created().body("CREATED") }),
    )
    .route(
        "/vary",
        web::get().to(|| async move {
            HttpResponse::Ok()
                .insert_header((header::VARY, "Accept-Encoding"))
                .body("VARY")
        }),
    )
    .route("/submit", web::route().to(|| async move { HttpResponse::Ok().body("OK") }));
}

/// Token from the response header of a fresh `GET /form`, plus the matching cookie.
#[allow(dead_code)]
pub async fn token_cookie<S>(app: &S, cookie_name: &str) -> (String, Cookie<'static>)
where
    S: Service<Request, Response = ServiceResponse<EitherBody<BoxBody>>, Error = actix_web::Error>,
{
    let req = test::TestRequest::get().uri("/form").to_request();
    let resp = test::call_service(app, req).await;
    assert!(resp.status().is_success());
    issued_token(&resp, cookie_name)
}

#[allow(dead_code)]
pub fn issued_token<B>(resp: &ServiceResponse<B>, cookie_name: &str) -> (String, Cookie<'static>) {
    let header_token = resp
        .headers()
        .get(DEFAULT_HEADER)
        .and_then(|hv| hv.to_str().ok())
        .expect("token header present")
        .to_string();

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == cookie_name)
        .map(|c| c.into_owned())
        .expect("token cookie present");

    assert_eq!(header_token, cookie.value());
    (header_token, cookie)
}
