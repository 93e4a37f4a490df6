//! Example demonstrating optimistic mutation with follow-up revalidation.
//!
//! A todo list is read stale-while-revalidate, a new todo is shown to
//! subscribers immediately, and the server's answer replaces it once the
//! revalidation settles. A second key shows the error channel.
//!
//! Run with `RUST_LOG=swr_engine=debug` to see the engine's decisions.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swr_engine::{
    FetchError, MutateOptions, MutateValue, RevalidateOptions, SwrBuilder, SwrOptions, SwrSettings,
    from_fn,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Todo {
    id: u32,
    title: String,
    done: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // The "server": a list the fetcher reads with a little latency.
    let server = Arc::new(Mutex::new(vec![Todo {
        id: 1,
        title: "write the docs".into(),
        done: false,
    }]));

    let origin = server.clone();
    let swr = SwrBuilder::<Vec<Todo>>::new()
        .settings(SwrSettings::from_env())
        .fetcher(from_fn(move |key: String| {
            let origin = origin.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                match key.as_str() {
                    "/api/todos" => {
                        let todos = origin.lock().map_err(|e| FetchError::failed(e.to_string()))?;
                        Ok(todos.clone())
                    }
                    _ => Err(FetchError::Status {
                        url: key.clone(),
                        status: 404,
                    }),
                }
            }
        }))
        .build();

    swr.cache().subscribe("/api/todos", |todos| match todos {
        Some(todos) => println!("subscriber: {} todo(s)", todos.len()),
        None => println!("subscriber: todos removed"),
    });
    swr.subscribe_errors("/api/missing", |err| println!("error channel: {}", err));

    // First read has nothing cached; it starts the fetch.
    let first = swr.read(&"/api/todos".into(), &SwrOptions::new());
    println!("first read: {:?}", first);
    if let Some(item) = swr.cache().get("/api/todos") {
        item.settled().await;
    }

    // The user adds a todo. Show it right away, then confirm with the server.
    let new_todo = Todo {
        id: 2,
        title: "ship the release".into(),
        done: false,
    };
    server.lock().map_err(|e| e.to_string())?.push(new_todo.clone());
    swr.mutate(
        Some("/api/todos"),
        MutateValue::update(move |prev: Option<&Vec<Todo>>| {
            let mut todos = prev.cloned().unwrap_or_default();
            todos.push(new_todo);
            todos
        }),
        &MutateOptions::new(),
    );
    if let Some(item) = swr.cache().get("/api/todos") {
        let confirmed = item.settled().await.unwrap_or_default();
        println!("confirmed by server: {:?}", confirmed);
    }

    // A key the server does not know: the error goes to the error channel
    // and the key is left absent.
    if let Some(item) = swr.revalidate(Some("/api/missing"), &RevalidateOptions::new()) {
        item.settled().await;
    }
    println!("missing key cached: {}", swr.cache().has("/api/missing"));

    Ok(())
}
