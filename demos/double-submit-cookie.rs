use actix_csrf_double_submit::{CsrfConfig, CsrfMiddleware, CsrfToken};
use actix_web::{App, HttpResponse, HttpServer, web};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Plain HTTP on localhost, so the cookie must not be `Secure`.
    let csrf_config = CsrfConfig::builder()
        .secure(false)
        .max_age(30)
        .build()
        .map_err(std::io::Error::other)?;
    let csrf = CsrfMiddleware::new(csrf_config);

    HttpServer::new(move || {
        App::new()
            .wrap(csrf.clone())
            // Token is also sent in the X-CSRF-Token response header
            .route("/form", web::get().to(|csrf: CsrfToken| async move {
                HttpResponse::Ok().body(format!("token:{}", csrf.0))
            }))
            // Mutating endpoint (requires X-CSRF-Token header matching the cookie)
            .route("/submit", web::post().to(|| async move { HttpResponse::Ok().finish() }))
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
