//! Basic example demonstrating typed JSON calls.
//!
//! This example shows how to:
//! - Create a client with basic configuration
//! - Build a typed request once and execute it
//! - Use the GET/POST shortcuts
//! - Send a request without a body and discard the response
//! - Access response data and metadata
//!
//! Run with: `cargo run --example basic_call`

use http::Method;
use jsonrest::{Client, Error, Request};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize, Default)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("jsonrest=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_uri("https://jsonplaceholder.typicode.com")
        .timeout(Duration::from_secs(10))
        .max_attempts(3)
        .build()?;

    println!("=== GET Request Example ===");
    let response = client.get::<Post>("/posts/1").await?;

    println!("Post ID: {}", response.data.id);
    println!("Title: {}", response.data.title);
    println!("Request latency: {:?}", response.latency);
    println!("Status: {} {}", response.status.as_u16(), response.status_text);
    println!();

    println!("=== Reusable Request Example ===");
    let create: Request<NewPost, Post> = Request::new(
        "/posts",
        Method::POST,
        NewPost {
            title: "My New Post".to_string(),
            body: "This is the content of my new post!".to_string(),
            user_id: 1,
        },
    );

    // The same request value can be executed as often as needed.
    let cancel = CancellationToken::new();
    for _ in 0..2 {
        let response = client.execute(&cancel, &create).await?;
        println!("Created post ID: {}", response.data.id);
    }
    println!();

    println!("=== Fire-and-forget Example ===");
    let delete = Request::bare("/posts/1", Method::DELETE);
    let response = client.send(&delete).await?;
    println!("Delete status: {}", response.status);
    println!();

    println!("=== Accessing Response Metadata ===");
    println!("Content-Type: {:?}", response.header("content-type"));
    println!("Attempts: {}", response.attempts);
    println!("Was retried: {}", response.was_retried());

    Ok(())
}
