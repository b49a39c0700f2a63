use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::api::{Completion, CountFetcher, FetchOutcome, VideoId, VoteCounts, VoteSubmitter};
use crate::config::DislikeConfig;
use crate::logging::ErrorLog;
use crate::puzzle::{self, Puzzle};
use crate::vote::VoteIntent;

const TAG: &str = "client";
const USER_ID_LEN: usize = 36;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub workers: usize,
    pub http_client: Option<HttpClient>,
}

impl From<&DislikeConfig> for ClientConfig {
    fn from(cfg: &DislikeConfig) -> Self {
        Self {
            base_url: cfg.api_url.clone(),
            user_agent: cfg.user_agent.clone(),
            timeout: cfg.timeout,
            workers: cfg.workers,
            http_client: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Confirmation {
    Flag(bool),
    Text(String),
}

impl Confirmation {
    fn accepted(&self) -> bool {
        match self {
            Confirmation::Flag(flag) => *flag,
            Confirmation::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// Blocking calls against the Return YouTube Dislike API.
pub struct Api {
    http: HttpClient,
    base_url: Url,
    user_agent: String,
    user_id: String,
    registered: Mutex<bool>,
}

impl Api {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("dislike client user agent required");
        }
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("client: parse api url {:?}", config.base_url))?;
        let http = match config.http_client.clone() {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("client: build http client")?,
        };

        Ok(Self {
            http,
            base_url,
            user_agent: config.user_agent.clone(),
            user_id: random_user_id(),
            registered: Mutex::new(false),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn fetch_votes(&self, video: &VideoId) -> Result<VoteCounts> {
        let mut url = self.endpoint("votes")?;
        url.query_pairs_mut().append_pair("videoId", video.as_str());
        let response = self
            .prepare(self.http.get(url))
            .send()
            .with_context(|| format!("client: fetch votes for {video}"))?;
        let response = ensure_success(response, "fetch votes")?;
        response
            .json()
            .with_context(|| format!("client: decode votes for {video}"))
    }

    pub fn send_vote(&self, video: &VideoId, vote: VoteIntent) -> Result<()> {
        self.ensure_registered()?;
        match self.try_vote(video, vote) {
            Err(err) if is_unauthorized(&err) => {
                // Server forgot us; register again and retry once.
                *self.registered.lock() = false;
                self.ensure_registered()?;
                self.try_vote(video, vote)
            }
            other => other,
        }
    }

    fn try_vote(&self, video: &VideoId, vote: VoteIntent) -> Result<()> {
        let body = json!({
            "userId": self.user_id(),
            "videoId": video.as_str(),
            "value": vote.code(),
        });
        let response = self
            .prepare(self.http.post(self.endpoint("interact/vote")?))
            .json(&body)
            .send()
            .context("client: send vote")?;
        let puzzle: Puzzle = ensure_success(response, "send vote")?
            .json()
            .context("client: decode vote puzzle")?;

        let solution = puzzle::solve(&puzzle)?;
        let body = json!({
            "userId": self.user_id(),
            "videoId": video.as_str(),
            "solution": solution,
        });
        let response = self
            .prepare(self.http.post(self.endpoint("interact/confirmVote")?))
            .json(&body)
            .send()
            .context("client: confirm vote")?;
        let confirmation: Confirmation = ensure_success(response, "confirm vote")?
            .json()
            .context("client: decode vote confirmation")?;
        if !confirmation.accepted() {
            bail!("client: vote for {video} was not confirmed");
        }
        Ok(())
    }

    fn ensure_registered(&self) -> Result<()> {
        let mut registered = self.registered.lock();
        if *registered {
            return Ok(());
        }

        let mut url = self.endpoint("puzzle/registration")?;
        url.query_pairs_mut().append_pair("userId", self.user_id());
        let response = self
            .prepare(self.http.get(url.clone()))
            .send()
            .context("client: request registration puzzle")?;
        let puzzle: Puzzle = ensure_success(response, "registration puzzle")?
            .json()
            .context("client: decode registration puzzle")?;

        let solution = puzzle::solve(&puzzle)?;
        let response = self
            .prepare(self.http.post(url))
            .json(&json!({ "solution": solution }))
            .send()
            .context("client: confirm registration")?;
        let confirmation: Confirmation = ensure_success(response, "confirm registration")?
            .json()
            .context("client: decode registration confirmation")?;
        if !confirmation.accepted() {
            bail!("client: registration was not confirmed");
        }
        *registered = true;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&url).with_context(|| format!("client: build url {url}"))
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("client: {action} failed with status {status}: {body}")]
struct StatusError {
    action: &'static str,
    status: StatusCode,
    body: String,
}

fn ensure_success(response: Response, action: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(StatusError {
        action,
        status,
        body,
    }
    .into())
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StatusError>()
        .map(|status| status.status == StatusCode::UNAUTHORIZED)
        .unwrap_or(false)
}

fn random_user_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USER_ID_LEN)
        .map(char::from)
        .collect()
}

enum Job {
    Fetch { video: VideoId, done: Completion },
    Vote { video: VideoId, vote: VoteIntent },
}

struct Inner {
    api: Api,
    log: Arc<dyn ErrorLog>,
    jobs: Sender<Job>,
    stop: Sender<()>,
}

/// Runs [`Api`] calls on a small worker pool so callers never wait on the network.
pub struct DislikeClient {
    inner: Arc<Inner>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl DislikeClient {
    pub fn new(config: ClientConfig, log: Arc<dyn ErrorLog>) -> Result<Self> {
        let api = Api::new(&config)?;
        let workers = if config.workers == 0 { 2 } else { config.workers };

        let (job_tx, job_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();

        let inner = Arc::new(Inner {
            api,
            log,
            jobs: job_tx,
            stop: stop_tx,
        });

        let mut handles = Vec::new();
        for _ in 0..workers {
            let rx_jobs = job_rx.clone();
            let rx_stop = stop_rx.clone();
            let worker_inner = inner.clone();
            handles.push(thread::spawn(move || worker_inner.worker(rx_jobs, rx_stop)));
        }

        Ok(Self { inner, handles })
    }

    fn enqueue(&self, job: Job) -> Result<()> {
        self.inner
            .jobs
            .send(job)
            .map_err(|_| anyhow!("client: worker pool stopped"))
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.inner.stop.send(());
        }
        let current = thread::current().id();
        while let Some(handle) = self.handles.pop() {
            // A completion can drop the last client handle on one of our own workers.
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for DislikeClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl CountFetcher for DislikeClient {
    fn request(&self, video: &VideoId, done: Completion) -> Result<()> {
        self.enqueue(Job::Fetch {
            video: video.clone(),
            done,
        })
    }
}

impl VoteSubmitter for DislikeClient {
    fn submit(&self, video: &VideoId, vote: VoteIntent) -> Result<()> {
        self.enqueue(Job::Vote {
            video: video.clone(),
            vote,
        })
    }
}

impl Inner {
    fn worker(&self, jobs: Receiver<Job>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => break,
                recv(jobs) -> msg => {
                    match msg {
                        Ok(job) => self.process(job),
                        Err(_) => break,
                    }
                }
            }
        }
    }

    fn process(&self, job: Job) {
        match job {
            Job::Fetch { video, done } => {
                let outcome = FetchOutcome::from(self.api.fetch_votes(&video));
                done(outcome);
            }
            Job::Vote { video, vote } => {
                if let Err(err) = self.api.send_vote(&video, vote) {
                    self.log.print_exception(
                        TAG,
                        &format!("failed to send {vote} vote for {video}"),
                        Some(&err),
                    );
                }
            }
        }
    }
}
