//! CNF normalization of constraint expressions.
//!
//! The [`Normalizer`] is the single entry point used by the feature model to
//! turn a `constraint` expression into CNF clauses. The conversion itself is
//! delegated to a [`CnfEngine`]:
//!
//! - [`BuiltinEngine`] converts in-process (see [`crate::cnf`]).
//! - [`CommandEngine`] runs an external boolean-algebra program.
//!
//! Every call gets its own [`CorrelationId`] and runs on a worker thread
//! bounded by a timeout, so calls never share external resources and a stuck
//! engine cannot hang the compilation.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use uuid::Uuid;

use crate::cnf::{CnfConverter, DEFAULT_MAX_CLAUSES};
use crate::error::EngineError;
use crate::expr::parse_expr;

/// Environment variable carrying the correlation token to a [`CommandEngine`] process.
pub const CORRELATION_ENV: &str = "FMC_CORRELATION_ID";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Unique token of a single normalizer call.
///
/// The instance part identifies the [`Normalizer`] (and its clones), the
/// sequence part is taken from a counter owned by that normalizer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CorrelationId {
    instance: Uuid,
    sequence: u64,
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.instance.simple(), self.sequence)
    }
}

/// A single conversion request handed to an engine.
#[derive(Debug, Clone)]
pub struct Request {
    pub token: CorrelationId,
    pub expression: String,
    pub deadline: Instant,
}

/// Something that converts a boolean expression into CNF.
///
/// The returned clauses, read as a conjunction, must be equivalent to the
/// request expression. Engines should give up once `request.deadline` passes.
pub trait CnfEngine: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn convert(&self, request: &Request) -> Result<Vec<String>, EngineError>;
}

/// In-process engine based on [`CnfConverter`].
#[derive(Debug, Clone)]
pub struct BuiltinEngine {
    max_clauses: usize,
}

impl BuiltinEngine {
    pub fn new(max_clauses: usize) -> Self {
        Self { max_clauses }
    }
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLAUSES)
    }
}

impl CnfEngine for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn convert(&self, request: &Request) -> Result<Vec<String>, EngineError> {
        let expr = parse_expr(&request.expression)?;
        let clauses = CnfConverter::new()
            .with_max_clauses(self.max_clauses)
            .with_deadline(request.deadline)
            .convert(&expr)?;
        Ok(clauses.iter().map(|c| c.to_string()).collect())
    }
}

/// Engine that runs an external program.
///
/// The program receives `Main_Exp: <expression>` on stdin and the correlation
/// token in [`CORRELATION_ENV`]. It must print the CNF on stdout as
/// `&`-separated terms; `~` is accepted for negation and each term may be
/// wrapped in one pair of parentheses.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn spawn(&self, request: &Request) -> Result<Child, EngineError> {
        Command::new(&self.program)
            .args(&self.args)
            .env(CORRELATION_ENV, request.token.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::unavailable(format!("cannot start `{}`: {}", self.program.display(), e)))
    }

    fn wait(&self, child: &mut Child, deadline: Instant) -> Result<ExitStatus, EngineError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    // The process may have exited in the meantime; nothing left to report then.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineError::timeout(format!(
                        "`{}` did not finish in time",
                        self.program.display()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(EngineError::unavailable(format!("cannot wait for `{}`: {}", self.program.display(), e))),
            }
        }
    }
}

fn read_to_string_in_background<R>(source: Option<R>) -> thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut source) = source {
            // A read error leaves whatever was read so far, the exit status decides the outcome.
            let _ = source.read_to_string(&mut buf);
        }
        buf
    })
}

fn write_in_background<W>(sink: Option<W>, input: String) -> thread::JoinHandle<io::Result<()>>
where
    W: Write + Send + 'static,
{
    thread::spawn(move || match sink {
        // Dropping the sink closes the pipe, so the engine sees end of input.
        Some(mut sink) => sink.write_all(input.as_bytes()),
        None => Ok(()),
    })
}

impl CnfEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    fn convert(&self, request: &Request) -> Result<Vec<String>, EngineError> {
        let mut child = self.spawn(request)?;

        // Output is drained while the input is still being written.
        let stdout = read_to_string_in_background(child.stdout.take());
        let stderr = read_to_string_in_background(child.stderr.take());
        let stdin = write_in_background(child.stdin.take(), format!("Main_Exp: {}\n", request.expression));

        let status = self.wait(&mut child, request.deadline)?;
        let written = stdin
            .join()
            .map_err(|_| EngineError::unavailable("stdin writer panicked"))?;
        let stdout = stdout
            .join()
            .map_err(|_| EngineError::unavailable("stdout reader panicked"))?;
        let stderr = stderr
            .join()
            .map_err(|_| EngineError::unavailable("stderr reader panicked"))?;

        if !status.success() {
            return Err(EngineError::malformed(format!(
                "`{}` exited with {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }
        match written {
            // The engine may exit successfully without reading all of its input.
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                return Err(EngineError::unavailable(format!(
                    "cannot write to `{}`: {}",
                    self.program.display(),
                    e
                )));
            }
            _ => {}
        }

        parse_terms(&stdout)
    }
}

/// Splits engine output into CNF terms.
///
/// Terms are separated by top-level `&`; `~` becomes `!` and one pair of
/// enclosing parentheses is removed. Every term must be a valid expression.
pub fn parse_terms(output: &str) -> Result<Vec<String>, EngineError> {
    let output = output.trim().replace('~', "!");
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in output.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '&' if depth == 0 => {
                terms.push(&output[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&output[start..]);

    let mut result = Vec::new();
    for term in terms {
        let term = strip_enclosing_parens(term.trim());
        if term.is_empty() {
            continue;
        }
        parse_expr(term).map_err(|e| EngineError::malformed(format!("engine returned `{}`: {}", term, e)))?;
        result.push(term.to_string());
    }
    Ok(result)
}

fn strip_enclosing_parens(term: &str) -> &str {
    let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        return term;
    };
    // Only strip when the opening parenthesis is closed by the last one.
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return term;
                }
            }
            _ => {}
        }
    }
    inner.trim()
}

/// Adapter between the feature model and a [`CnfEngine`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    engine: Arc<dyn CnfEngine>,
    timeout: Duration,
    instance: Uuid,
    sequence: Arc<AtomicU64>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(BuiltinEngine::default())
    }
}

impl Normalizer {
    pub fn new(engine: impl CnfEngine + 'static) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<dyn CnfEngine>) -> Self {
        Self {
            engine,
            timeout: DEFAULT_TIMEOUT,
            instance: Uuid::new_v4(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn next_token(&self) -> CorrelationId {
        CorrelationId {
            instance: self.instance,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Converts `expression` into CNF clauses (an implicit conjunction).
    pub fn normalize(&self, expression: &str) -> Result<Vec<String>, EngineError> {
        // Reject malformed input before paying for an engine call.
        parse_expr(expression)?;

        let token = self.next_token();
        let request = Request {
            token,
            expression: expression.to_string(),
            deadline: Instant::now() + self.timeout,
        };
        debug!("[{}] normalize `{}` with {} engine", token, expression, self.engine.name());

        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        thread::Builder::new()
            .name(format!("cnf-{}", token))
            .spawn(move || {
                let result = engine.convert(&request);
                // The receiver is gone if the call already timed out.
                let _ = tx.send(result);
            })
            .map_err(|e| EngineError::unavailable(format!("cannot start worker: {}", e)))?;

        let result = match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(EngineError::timeout(format!("no answer within {:?}", self.timeout))),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::unavailable("engine worker stopped without an answer")),
        };

        match &result {
            Ok(clauses) => debug!("[{}] -> {} clause(s)", token, clauses.len()),
            Err(e) => warn!("[{}] normalization failed: {}", token, e),
        }
        result
    }
}
