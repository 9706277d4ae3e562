//! A named prompt application: its messages, variables, format hint and the
//! latest response.
//!
//! Template files are looked up relative to the app's working directory:
//!
//! ```text
//! <workdir>/
//!   ├── {name}.md              (system; overrides {name}_system.md)
//!   ├── {name}_system.md
//!   ├── {name}_user.md
//!   ├── {name}_assistant.md
//!   └── answers/
//!       └── {basename}_result_latest.md
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info};

use crate::compiler::{self, CompiledPrompt, FormatHint, Variables};
use crate::message::{self, MessageStore, Role, DEFAULT_FILE_REF_THRESHOLD};
use crate::model::{Model, SamplingParams};
use crate::ports::filesystem::FileSystem;
use crate::ports::llm::{CompletionRequest, LlmClient};

/// Directory, relative to the working directory, holding latest results.
pub const RESULTS_DIR: &str = "answers";

/// Where an app reads templates from and writes results to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppOptions {
    /// Directory templates and results are resolved against.
    pub workdir: PathBuf,
    /// Results directory, relative to `workdir`.
    pub results_dir: PathBuf,
    /// Values shorter than this may name a template file.
    pub file_ref_threshold: usize,
}

impl AppOptions {
    /// Default options rooted at `workdir`.
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            results_dir: PathBuf::from(RESULTS_DIR),
            file_ref_threshold: DEFAULT_FILE_REF_THRESHOLD,
        }
    }
}

/// A named prompt application.
pub struct App {
    name: String,
    options: AppOptions,
    fs: Rc<dyn FileSystem>,
    llm: Box<dyn LlmClient>,
    messages: MessageStore,
    vars: Variables,
    format: FormatHint,
    response: String,
    compiled_system_prompt: String,
}

impl App {
    /// Creates the app and loads its conventional template files and any
    /// previously saved result.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing template or result file cannot be read.
    pub fn new(
        name: impl Into<String>,
        options: AppOptions,
        fs: Rc<dyn FileSystem>,
        llm: Box<dyn LlmClient>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut app = Self {
            name: name.into(),
            options,
            fs,
            llm,
            messages: MessageStore::new(),
            vars: Variables::default(),
            format: FormatHint::None,
            response: String::new(),
            compiled_system_prompt: String::new(),
        };
        app.load_templates()?;
        app.load_latest_result()?;
        Ok(app)
    }

    fn load_templates(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let suffixed = Role::ALL.map(|role| (format!("{}_{role}.md", self.name), role));
        let unsuffixed = (format!("{}.md", self.name), Role::System);

        for (file, role) in suffixed.into_iter().chain(std::iter::once(unsuffixed)) {
            let path = self.options.workdir.join(&file);
            if self.fs.is_file(&path) {
                debug!(app = %self.name, role = %role, path = %path.display(), "loading template");
                let content = self.fs.read_to_string(&path)?;
                self.messages.insert(role, content);
            }
        }
        Ok(())
    }

    fn load_latest_result(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let path = self.result_path();
        if self.fs.is_file(&path) {
            debug!(app = %self.name, path = %path.display(), "loading latest result");
            self.response = self.fs.read_to_string(&path)?;
        }
        Ok(())
    }

    /// The app's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The app's options.
    #[must_use]
    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Final path component of the name, without a trailing `.md`.
    #[must_use]
    pub fn basename(&self) -> String {
        let file_name = Path::new(&self.name)
            .file_name()
            .map_or_else(|| self.name.clone(), |f| f.to_string_lossy().into_owned());
        file_name.strip_suffix(".md").map(str::to_string).unwrap_or(file_name)
    }

    /// File the latest response is persisted to.
    #[must_use]
    pub fn result_path(&self) -> PathBuf {
        self.options
            .workdir
            .join(&self.options.results_dir)
            .join(format!("{}_result_latest.md", self.basename()))
    }

    /// Sets a role's message from a template name or literal text.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching template exists but cannot be read.
    pub fn set_message(
        &mut self,
        role: Role,
        value: &str,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = message::resolve_content(
            self.fs.as_ref(),
            &self.options.workdir,
            role,
            value,
            self.options.file_ref_threshold,
        )?;
        self.messages.insert(role, content);
        Ok(self)
    }

    /// Trimmed message for `role`, or empty when unset.
    #[must_use]
    pub fn message(&self, role: Role) -> String {
        self.messages.get(role).map(str::trim).unwrap_or_default().to_string()
    }

    /// Sets the system message. See [`App::set_message`].
    ///
    /// # Errors
    ///
    /// Returns an error if a matching template cannot be read.
    pub fn set_system(
        &mut self,
        value: &str,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.set_message(Role::System, value)
    }

    /// Sets the user message. See [`App::set_message`].
    ///
    /// # Errors
    ///
    /// Returns an error if a matching template cannot be read.
    pub fn set_user(
        &mut self,
        value: &str,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.set_message(Role::User, value)
    }

    /// Sets the assistant message. See [`App::set_message`].
    ///
    /// # Errors
    ///
    /// Returns an error if a matching template cannot be read.
    pub fn set_assistant(
        &mut self,
        value: &str,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.set_message(Role::Assistant, value)
    }

    /// Trimmed system message.
    #[must_use]
    pub fn system(&self) -> String {
        self.message(Role::System)
    }

    /// Trimmed user message.
    #[must_use]
    pub fn user(&self) -> String {
        self.message(Role::User)
    }

    /// Trimmed assistant message.
    #[must_use]
    pub fn assistant(&self) -> String {
        self.message(Role::Assistant)
    }

    /// Removes all stored messages. Variables and the format hint stay.
    pub fn clear(&mut self) -> &mut Self {
        self.messages.clear();
        self
    }

    /// Declares a variable for the system prompt.
    pub fn var(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.set(name, value);
        self
    }

    /// Variables declared so far.
    #[must_use]
    pub fn vars(&self) -> &Variables {
        &self.vars
    }

    /// Asks for responses shaped like `example`. Clears any schema.
    pub fn example_json(&mut self, example: Value) -> &mut Self {
        self.format = FormatHint::Example(example);
        self
    }

    /// Asks for responses following `schema`. Clears any example.
    pub fn json_schema(&mut self, schema: Value) -> &mut Self {
        self.format = FormatHint::Schema(schema);
        self
    }

    /// Current format hint.
    #[must_use]
    pub fn format_hint(&self) -> &FormatHint {
        &self.format
    }

    /// Compiles the stored state without sending anything.
    #[must_use]
    pub fn compile(&self) -> CompiledPrompt {
        compiler::compile(&self.messages, &self.vars, &self.format)
    }

    /// System prompt as sent by the last [`App::prompt`] call.
    #[must_use]
    pub fn system_compiled(&self) -> &str {
        &self.compiled_system_prompt
    }

    /// Sends the compiled prompt and stores and persists the response.
    ///
    /// `user_message`, when given, replaces the user role first (template
    /// names are resolved as with [`App::set_user`]). Blocks until the
    /// service answers; must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Returns the service error unchanged, or an error if the runtime cannot
    /// start or the result cannot be written.
    pub fn prompt(
        &mut self,
        model: impl Into<Model>,
        user_message: Option<&str>,
        params: SamplingParams,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        let model = model.into();
        if let Some(message) = user_message {
            self.set_user(message)?;
        }

        let compiled = self.compile();
        self.compiled_system_prompt = compiled.system_prompt;

        let request = CompletionRequest {
            model: model.id().to_string(),
            messages: compiled.messages,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
            json_response: self.format.is_active() && model.supports_json_mode(),
        };

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let response = runtime.block_on(self.llm.complete(&request))?;
        info!(
            app = %self.name,
            model = %model,
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "completion received"
        );
        self.response = response.text;

        let path = self.result_path();
        self.fs.write(&path, &self.response)?;
        debug!(app = %self.name, path = %path.display(), "latest result saved");
        Ok(self)
    }

    /// [`App::prompt`] with `gpt-3.5-turbo-1106`.
    ///
    /// # Errors
    ///
    /// See [`App::prompt`].
    pub fn gpt35turbo(
        &mut self,
        user_message: Option<&str>,
        params: SamplingParams,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.prompt(Model::Gpt35Turbo, user_message, params)
    }

    /// [`App::prompt`] with `gpt-3.5`.
    ///
    /// # Errors
    ///
    /// See [`App::prompt`].
    pub fn gpt35(
        &mut self,
        user_message: Option<&str>,
        params: SamplingParams,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.prompt(Model::Gpt35, user_message, params)
    }

    /// [`App::prompt`] with `gpt-4-1106-preview`.
    ///
    /// # Errors
    ///
    /// See [`App::prompt`].
    pub fn gpt4turbo(
        &mut self,
        user_message: Option<&str>,
        params: SamplingParams,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.prompt(Model::Gpt4Turbo, user_message, params)
    }

    /// [`App::prompt`] with `gpt-4`.
    ///
    /// # Errors
    ///
    /// See [`App::prompt`].
    pub fn gpt4(
        &mut self,
        user_message: Option<&str>,
        params: SamplingParams,
    ) -> Result<&mut Self, Box<dyn std::error::Error + Send + Sync>> {
        self.prompt(Model::Gpt4, user_message, params)
    }

    /// Latest response, verbatim.
    #[must_use]
    pub fn result(&self) -> &str {
        &self.response
    }

    /// Writes the latest response followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_result(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "{}", self.response)
    }

    /// Prints the latest response to stdout.
    pub fn result_print(&self) {
        println!("{}", self.response);
    }
}
