//! Minimal kiroku demo — one wrapped operation behind the server.
//!
//! Run with:
//!   RUST_LOG=debug NODE_ENV=development cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/1
//!   curl http://localhost:3000/users/2          # 404 envelope, errors.log
//!   curl http://localhost:3000/boom             # panic → 500 envelope
//!   tail -f logs/success.log logs/errors.log

use kiroku::{Failure, HttpError, Recorder, Request, Response, Server};

#[tokio::main]
async fn main() -> Result<(), kiroku::Error> {
    tracing_subscriber::fmt::init();

    let recorder = Recorder::from_env();

    Server::bind("0.0.0.0:3000")?
        .error_handler(recorder.error_responder())
        .serve(recorder.wrap(app))
        .await
}

async fn app(req: Request) -> Result<Response, Failure> {
    match req.url() {
        "/users/1" => Ok(Response::json(br#"{"id":"1","name":"alice"}"#.to_vec())),
        "/boom" => panic!("simulated crash"),
        url if url.starts_with("/users/") => Err(HttpError::new(404, "Not Found")
            .with_detail("id", url.trim_start_matches("/users/"))
            .into()),
        _ => Err(Failure::status(400)),
    }
}
