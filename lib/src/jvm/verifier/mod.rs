//! Class file verification
//!
//! Verification happens in a fixed sequence of passes, mirroring what a class loader does:
//!
//!   1. **structural load**: the class can be found, decodes, and is the class that was asked
//!      for (see [`ClassRepository`])
//!   2. **static constraints**: constant pool cross references, names, descriptors, and access
//!      flags are well formed
//!   3. **per-method constraints** (`3a`): instruction operands reference the right kinds of
//!      constants, local variables are in range, exception tables are sensible
//!   4. **dataflow** (`3b`): simulating every method body over abstract types (see
//!      [`VerificationType`]) never finds an inconsistent state
//!
//! Each pass assumes the previous ones succeeded, so a rejection short-circuits everything after
//! it. Any fault found along the way (including decoding errors) is reported as a
//! [`VerificationResult`] with status [`VerificationStatus::Rejected`], never as an error.
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. That
//! structure is tracked with a [`Frame`] and, when an instruction can be reached from several
//! places, the frames coming from the different places are merged until nothing changes any more.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10

mod frame;
mod pass1;
mod pass2;
mod pass3a;
mod pass3b;
mod repository;
mod types;

pub use frame::*;
pub use repository::*;
pub use types::*;

use crate::jvm::class_file::ClassFile;
use crate::jvm::{BinaryName, Error};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
    Ok,
    Rejected,
}

/// Verdict of a verification pass, with a free-text diagnostic
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub message: String,
}

impl VerificationResult {
    pub fn ok() -> VerificationResult {
        VerificationResult {
            status: VerificationStatus::Ok,
            message: String::from("All Okay."),
        }
    }

    pub fn rejected(message: impl Into<String>) -> VerificationResult {
        VerificationResult {
            status: VerificationStatus::Rejected,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == VerificationStatus::Ok
    }

    fn from_outcome(outcome: Result<(), Error>) -> VerificationResult {
        match outcome {
            Ok(()) => VerificationResult::ok(),
            Err(err) => VerificationResult::rejected(err.to_string()),
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            VerificationStatus::Ok => write!(f, "VERIFIED_OK: {}", self.message),
            VerificationStatus::Rejected => write!(f, "VERIFIED_REJECTED: {}", self.message),
        }
    }
}

/// Verification settings
#[derive(Clone, Debug)]
pub struct Settings {
    /// Newest class file major version accepted (Java 21 is 65)
    pub max_major_version: u16,

    /// Run the dataflow pass (`3b`)
    pub verify_dataflow: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            max_major_version: 65,
            verify_dataflow: true,
        }
    }
}

/// Identifies one pass (per-method passes carry the index of the method in the class)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    Pass1,
    Pass2,
    Pass3a(usize),
    Pass3b(usize),
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Pass1 => f.write_str("pass 1"),
            Pass::Pass2 => f.write_str("pass 2"),
            Pass::Pass3a(method) => write!(f, "pass 3a (method #{})", method),
            Pass::Pass3b(method) => write!(f, "pass 3b (method #{})", method),
        }
    }
}

/// Verifier for one class
///
/// Results of every pass are remembered, so asking for the same pass twice does not redo the
/// work.
pub struct Verifier<'r, R: ClassRepository + ?Sized> {
    class_name: String,
    repository: &'r R,
    settings: Settings,
    class: Option<Arc<ClassFile>>,
    results: HashMap<Pass, VerificationResult>,
    executed: Vec<Pass>,
}

impl<'r, R: ClassRepository + ?Sized> Verifier<'r, R> {
    /// Verifier for a class, named either `a.b.Foo` or `a/b/Foo`
    pub fn new(class_name: &str, repository: &'r R, settings: Settings) -> Verifier<'r, R> {
        Verifier {
            class_name: BinaryName::internal_form(class_name).into_owned(),
            repository,
            settings,
            class: None,
            results: HashMap::new(),
            executed: vec![],
        }
    }

    /// Name of the class being verified, in internal form
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Class loaded by pass 1 (if it succeeded)
    pub fn class(&self) -> Option<&Arc<ClassFile>> {
        self.class.as_ref()
    }

    /// Passes actually run, in the order they ran
    pub fn executed_passes(&self) -> &[Pass] {
        &self.executed
    }

    fn record(&mut self, pass: Pass, result: VerificationResult) -> VerificationResult {
        match result.status {
            VerificationStatus::Ok => debug!("{}: {} succeeded", self.class_name, pass),
            VerificationStatus::Rejected => {
                warn!("{}: {} rejected: {}", self.class_name, pass, result.message)
            }
        }
        self.executed.push(pass);
        self.results.insert(pass, result.clone());
        result
    }

    pub fn do_pass1(&mut self) -> VerificationResult {
        if let Some(result) = self.results.get(&Pass::Pass1) {
            return result.clone();
        }
        let result = match pass1::verify(self.repository, &self.class_name, &self.settings) {
            Ok(class) => {
                self.class = Some(class);
                VerificationResult::ok()
            }
            Err(err) => VerificationResult::rejected(err.to_string()),
        };
        self.record(Pass::Pass1, result)
    }

    pub fn do_pass2(&mut self) -> VerificationResult {
        if let Some(result) = self.results.get(&Pass::Pass2) {
            return result.clone();
        }
        let previous = self.do_pass1();
        let class = match (&previous.status, &self.class) {
            (VerificationStatus::Ok, Some(class)) => class.clone(),
            _ => return previous,
        };
        let result = VerificationResult::from_outcome(pass2::verify(&class));
        self.record(Pass::Pass2, result)
    }

    pub fn do_pass3a(&mut self, method: usize) -> VerificationResult {
        if let Some(result) = self.results.get(&Pass::Pass3a(method)) {
            return result.clone();
        }
        let previous = self.do_pass2();
        let class = match (&previous.status, &self.class) {
            (VerificationStatus::Ok, Some(class)) => class.clone(),
            _ => return previous,
        };
        let result = VerificationResult::from_outcome(pass3a::verify(&class, method));
        self.record(Pass::Pass3a(method), result)
    }

    pub fn do_pass3b(&mut self, method: usize) -> VerificationResult {
        if let Some(result) = self.results.get(&Pass::Pass3b(method)) {
            return result.clone();
        }
        let previous = self.do_pass3a(method);
        let class = match (&previous.status, &self.class) {
            (VerificationStatus::Ok, Some(class)) => class.clone(),
            _ => return previous,
        };
        let result = VerificationResult::from_outcome(pass3b::verify(&class, method));
        self.record(Pass::Pass3b(method), result)
    }

    /// Run every pass, stopping at the first rejection
    ///
    /// The per-method structural pass runs on every method before dataflow runs on any of them.
    pub fn verify(&mut self) -> VerificationResult {
        let result = self.do_pass2();
        if !result.is_ok() {
            return result;
        }
        let method_count = self.class.as_ref().map_or(0, |class| class.methods.len());
        for method in 0..method_count {
            let result = self.do_pass3a(method);
            if !result.is_ok() {
                return result;
            }
        }
        if self.settings.verify_dataflow {
            for method in 0..method_count {
                let result = self.do_pass3b(method);
                if !result.is_ok() {
                    return result;
                }
            }
        }
        info!("{} verified ({} methods)", self.class_name, method_count);
        VerificationResult::ok()
    }
}

/// Name used for a method in diagnostics (`name descriptor`)
fn method_label(class: &ClassFile, method: usize) -> String {
    class
        .methods
        .get(method)
        .and_then(|m| {
            let name = m.name(&class.constants).ok()?;
            let descriptor = m.descriptor(&class.constants).ok()?;
            Some(format!("{}{}", name, descriptor))
        })
        .unwrap_or_else(|| format!("method #{}", method))
}
