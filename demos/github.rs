//! Example describing a slice of the GitHub REST API.
//!
//! This example shows how to:
//! - Describe an interface with request lines, headers and parameters
//! - Wrap an `Instance` in a typed adapter
//! - Provide a default method on the adapter itself
//! - Log requests through `tracing`
//!
//! Run with: `cargo run --example github`

use courier::codec::{JsonDecoder, JsonEncoder};
use courier::contract::{
    attr, InterfaceDescriptor, MethodDescriptor, MethodKind, ParamDescriptor, TypeRef,
};
use courier::{args, Client, Error, Instance, LogLevel, TracingLogger};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Contributor {
    login: String,
    contributions: u32,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Issue {
    number: u64,
    title: String,
    state: String,
}

fn github() -> Arc<InterfaceDescriptor> {
    let string_param = |name: &str| {
        ParamDescriptor::new(TypeRef::string()).attribute(attr::Param::new(name))
    };

    Arc::new(
        InterfaceDescriptor::new("GitHub")
            .attribute(attr::Headers::new([
                "Accept: application/vnd.github+json",
                "User-Agent: courier-demo",
            ]))
            .method(
                MethodDescriptor::new("contributors")
                    .attribute(attr::RequestLine::new("GET /repos/{owner}/{repo}/contributors"))
                    .param(string_param("owner"))
                    .param(string_param("repo"))
                    .returns(TypeRef::list(TypeRef::named("Contributor"))),
            )
            .method(
                MethodDescriptor::new("issues")
                    .attribute(attr::RequestLine::new(
                        "GET /repos/{owner}/{repo}/issues?state={state}&per_page={per_page}",
                    ))
                    .param(string_param("owner"))
                    .param(string_param("repo"))
                    .param(string_param("state"))
                    .param(
                        ParamDescriptor::new(TypeRef::named("u32"))
                            .attribute(attr::Param::new("per_page")),
                    )
                    .returns(TypeRef::list(TypeRef::named("Issue"))),
            )
            .method(
                MethodDescriptor::new("top_contributor")
                    .kind(MethodKind::Default)
                    .param(ParamDescriptor::new(TypeRef::string()))
                    .param(ParamDescriptor::new(TypeRef::string()))
                    .returns(TypeRef::optional(TypeRef::string())),
            ),
    )
}

/// Typed facade over the dynamic instance.
struct GitHub {
    api: Instance,
}

impl GitHub {
    fn connect(url: &str) -> Result<Self, Error> {
        let api = Client::builder()
            .encoder(JsonEncoder)
            .decoder(JsonDecoder)
            .logger(TracingLogger)
            .log_level(LogLevel::Basic)
            .target(github(), url)?;
        Ok(Self { api })
    }

    fn contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>, Error> {
        self.api.call("contributors", &args![owner, repo])?.json()
    }

    fn open_issues(&self, owner: &str, repo: &str, limit: u32) -> Result<Vec<Issue>, Error> {
        self.api
            .call("issues", &args![owner, repo, "open", limit])?
            .json()
    }

    /// Implemented here rather than sent to the server.
    fn top_contributor(&self, owner: &str, repo: &str) -> Result<Option<String>, Error> {
        let contributors = self.contributors(owner, repo)?;
        Ok(contributors
            .into_iter()
            .max_by_key(|c| c.contributions)
            .map(|c| c.login))
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,github=info")
        .init();

    let github = GitHub::connect("https://api.github.com")?;
    println!("Dispatched methods: {:?}", github.api.config_keys());

    println!("=== Contributors ===");
    for contributor in github.contributors("rust-lang", "rust")?.iter().take(5) {
        println!("{} ({} contributions)", contributor.login, contributor.contributions);
    }

    println!("\n=== Open issues ===");
    for issue in github.open_issues("rust-lang", "rust", 5)? {
        println!("#{} {}", issue.number, issue.title);
    }

    match github.top_contributor("rust-lang", "rust")? {
        Some(login) => println!("\nTop contributor: {}", login),
        None => println!("\nNo contributors found"),
    }

    Ok(())
}
