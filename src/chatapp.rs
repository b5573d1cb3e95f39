use poll_promise::Promise;
use std::future::Future;
use std::path::PathBuf;
use tokio::runtime::Handle;

use crate::chat::ChatSession;
use crate::nimclient::{NimClient, NimError};
use crate::settings::{self, Settings};

pub const READY: &str = "Ready.";
pub const SELECT_MODEL: &str = "Select model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Settings,
}

pub struct ChatApp {
    pub runtime: Handle,
    pub config_path: PathBuf,
    pub settings: Settings,
    // Edit buffers for the settings screen; committed by `save_settings`.
    pub base_url_input: String,
    pub api_key_input: String,
    pub system_prompt_input: String,
    pub available_models: Vec<String>,
    pub status_text: String,
    pub screen: Screen,
    pub input: String,
    pub session: ChatSession,
    pending_models: Option<Promise<Result<Vec<String>, NimError>>>,
    pending_health: Option<Promise<Result<(), NimError>>>,
    pending_reply: Option<Promise<Result<String, NimError>>>,
}

impl ChatApp {
    pub fn new(runtime: Handle, config_path: PathBuf) -> Self {
        let outcome = settings::load(&config_path);
        let status_text = outcome.status().unwrap_or_else(|| READY.to_string());
        let settings = outcome.into_settings();

        Self {
            runtime,
            config_path,
            base_url_input: settings.base_url.clone(),
            api_key_input: settings.api_key.clone(),
            system_prompt_input: settings.system_prompt.clone(),
            settings,
            available_models: Vec::new(),
            status_text,
            screen: Screen::Chat,
            input: String::new(),
            session: ChatSession::default(),
            pending_models: None,
            pending_health: None,
            pending_reply: None,
        }
    }

    pub fn show_screen(&mut self, screen: Screen) {
        self.screen = screen;
    }

    pub fn set_model(&mut self, text: &str) {
        if !text.is_empty() && text != SELECT_MODEL {
            self.settings.model_name = text.to_string();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending_models.is_some() || self.pending_health.is_some() || self.pending_reply.is_some()
    }

    pub fn is_thinking(&self) -> bool {
        self.pending_reply.is_some()
    }

    /// Commit the edit buffers and write the settings file.
    ///
    /// Returns false if the file could not be written; the status line says why.
    pub fn save_settings(&mut self) -> bool {
        self.settings.base_url = self.base_url_input.trim().to_string();
        self.settings.api_key = self.api_key_input.trim().to_string();
        self.settings.system_prompt = self.system_prompt_input.clone();
        self.base_url_input = self.settings.base_url.clone();
        self.api_key_input = self.settings.api_key.clone();

        match settings::save(&self.config_path, &self.settings) {
            Ok(()) => {
                self.status_text = "Saved settings.".to_string();
                true
            }
            Err(e) => {
                tracing::warn!("Failed to save settings: {}", e);
                self.status_text = format!("Save failed: {}", e);
                false
            }
        }
    }

    pub fn load_models(&mut self) {
        if self.pending_models.is_some() || !self.save_settings() {
            return;
        }
        self.status_text = "Loading models...".to_string();

        let client = NimClient::new(&self.settings);
        self.pending_models = Some(self.spawn("nim_models", async move { client.list_models().await }));
    }

    pub fn test_health(&mut self) {
        if self.pending_health.is_some() || !self.save_settings() {
            return;
        }
        self.status_text = "Testing health...".to_string();

        let client = NimClient::new(&self.settings);
        self.pending_health = Some(self.spawn("nim_health", async move { client.health_ready().await }));
    }

    /// Ignored while a reply is in flight, so the input and `Thinking...` stay put.
    pub fn on_send(&mut self) {
        if self.pending_reply.is_some() || !self.save_settings() {
            return;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.settings.model_name.is_empty() {
            self.status_text = "Pick/load a model first (Settings → Load models).".to_string();
            return;
        }

        self.input.clear();
        self.session.push_user(text);
        self.status_text = "Thinking...".to_string();

        let client = NimClient::new(&self.settings);
        let model = self.settings.model_name.clone();
        let messages = self.session.request_messages(&self.settings.system_prompt);
        self.pending_reply = Some(self.spawn("nim_chat_reply", async move { client.chat(&model, &messages).await }));
    }

    /// Drop the conversation. A reply still in flight is discarded.
    pub fn new_chat(&mut self) {
        self.pending_reply = None;
        self.session.clear();
        self.status_text = READY.to_string();
    }

    /// Apply results of finished background requests. Called once per frame.
    pub fn poll_tasks(&mut self) {
        if let Some(result) = take_ready(&mut self.pending_models) {
            self.apply_models(result);
        }
        if let Some(result) = take_ready(&mut self.pending_health) {
            self.status_text = match result {
                Ok(()) => "Health OK.".to_string(),
                Err(e) => {
                    tracing::warn!("Health check failed: {}", e);
                    format!("Health failed: {}", e)
                }
            };
        }
        if let Some(result) = take_ready(&mut self.pending_reply) {
            match result {
                Ok(reply) => {
                    self.session.push_assistant(reply);
                    self.status_text = READY.to_string();
                }
                Err(e) => {
                    tracing::warn!("Chat request failed: {}", e);
                    self.status_text = format!("Send failed: {}", e);
                }
            }
        }
    }

    fn apply_models(&mut self, result: Result<Vec<String>, NimError>) {
        match result {
            Ok(models) => {
                if !models.contains(&self.settings.model_name) {
                    if let Some(first) = models.first() {
                        self.settings.model_name = first.clone();
                    }
                }
                self.status_text = format!("Loaded {} models.", models.len());
                self.available_models = models;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch models: {}", e);
                self.status_text = format!("Load models failed: {}", e);
            }
        }
    }

    fn spawn<T, F>(&self, name: &str, task: F) -> Promise<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let runtime = self.runtime.clone();
        Promise::spawn_thread(name, move || runtime.block_on(task))
    }
}

fn take_ready<T: Send + 'static>(slot: &mut Option<Promise<T>>) -> Option<T> {
    let promise = slot.take()?;
    match promise.try_take() {
        Ok(value) => Some(value),
        Err(promise) => {
            *slot = Some(promise);
            None
        }
    }
}
