//! The unit of evaluation.
//!
//! An operation owns the results of its outputs and reads the results of
//! other operations through its inputs. The evaluator drives every operation
//! through the same lifecycle:
//!
//! 1. construction, which populates output results and input descriptors,
//! 2. reference counting against the schedule,
//! 3. input mapping to the upstream results they read,
//! 4. evaluation, which executes the operation and then releases each mapped
//!    input exactly once.

use std::collections::{HashMap, HashSet};

use crate::context::Context;
use crate::error::CompositorError;
use crate::input_descriptor::InputDescriptor;
use crate::result::OperationResult;
use crate::schedule::Schedule;

/// Where an input finds the result it reads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResultLocation {
    /// Index of the producing operation in evaluation order.
    pub operation: usize,
    /// Output identifier within that operation.
    pub identifier: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Constructed,
    ReferenceCounted,
    Executed,
}

/// State shared by every operation.
pub struct OperationBase<'a> {
    context: &'a Context<'a>,
    results: HashMap<String, OperationResult>,
    input_descriptors: HashMap<String, InputDescriptor>,
    input_mapping: HashMap<String, ResultLocation>,
    state: OperationState,
}

impl<'a> OperationBase<'a> {
    pub fn new(context: &'a Context<'a>) -> Self {
        Self {
            context,
            results: HashMap::new(),
            input_descriptors: HashMap::new(),
            input_mapping: HashMap::new(),
            state: OperationState::Constructed,
        }
    }

    pub fn context(&self) -> &'a Context<'a> {
        self.context
    }

    pub fn populate_result(&mut self, identifier: &str, result: OperationResult) {
        self.results.insert(identifier.to_string(), result);
    }

    pub fn declare_input_descriptor(&mut self, identifier: &str, descriptor: InputDescriptor) {
        self.input_descriptors
            .insert(identifier.to_string(), descriptor);
    }

    /// Panics if the operation has no output called `identifier`.
    pub fn get_result(&self, identifier: &str) -> &OperationResult {
        match self.results.get(identifier) {
            Some(result) => result,
            None => panic!("operation has no result '{}'", identifier),
        }
    }

    /// Panics if the operation has no output called `identifier`.
    pub fn get_result_mut(&mut self, identifier: &str) -> &mut OperationResult {
        match self.results.get_mut(identifier) {
            Some(result) => result,
            None => panic!("operation has no result '{}'", identifier),
        }
    }

    pub fn get_input_descriptor(&self, identifier: &str) -> Option<&InputDescriptor> {
        self.input_descriptors.get(identifier)
    }

    pub fn input_descriptors(&self) -> &HashMap<String, InputDescriptor> {
        &self.input_descriptors
    }

    pub fn results(&self) -> &HashMap<String, OperationResult> {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut HashMap<String, OperationResult> {
        &mut self.results
    }

    /// Record that input `identifier` reads the result at `location`.
    pub fn map_input_to_result(&mut self, identifier: &str, location: ResultLocation) {
        self.input_mapping.insert(identifier.to_string(), location);
    }

    pub fn input_mapping(&self) -> &HashMap<String, ResultLocation> {
        &self.input_mapping
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn set_state(&mut self, state: OperationState) {
        self.state = state;
    }
}

/// The results an operation reads while it executes.
///
/// Lives only for one call to [`Operation::evaluate`] and borrows the
/// operations that run before the one being evaluated.
pub struct InputResults<'u, 'a> {
    upstream: &'u mut [Box<dyn Operation<'a> + 'a>],
    mapping: HashMap<String, ResultLocation>,
    released: HashSet<String>,
    context: &'a Context<'a>,
}

impl<'u, 'a> InputResults<'u, 'a> {
    /// The result input `identifier` reads, or `None` if it is not mapped.
    ///
    /// Panics if the input was already released.
    pub fn get(&self, identifier: &str) -> Option<&OperationResult> {
        assert!(
            !self.released.contains(identifier),
            "input '{}' read after being released",
            identifier
        );
        let location = self.mapping.get(identifier)?;
        Some(
            self.upstream[location.operation]
                .base()
                .get_result(&location.identifier),
        )
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.mapping.keys().map(String::as_str)
    }

    /// Release input `identifier` early. Inputs not released by the
    /// operation are released after it executes.
    ///
    /// Panics if the input is not mapped or was already released.
    pub fn release(&mut self, identifier: &str) {
        let location = match self.mapping.get(identifier) {
            Some(location) => location,
            None => panic!("input '{}' released but never mapped", identifier),
        };
        assert!(
            self.released.insert(identifier.to_string()),
            "input '{}' released twice",
            identifier
        );
        let mut pool = self.context.texture_pool();
        self.upstream[location.operation]
            .base_mut()
            .get_result_mut(&location.identifier)
            .release(&mut pool);
    }

    fn release_all(&mut self) {
        let mut pending: Vec<String> = self
            .mapping
            .keys()
            .filter(|identifier| !self.released.contains(*identifier))
            .cloned()
            .collect();
        pending.sort();
        for identifier in pending {
            self.release(&identifier);
        }
    }
}

pub trait Operation<'a> {
    fn base(&self) -> &OperationBase<'a>;

    fn base_mut(&mut self) -> &mut OperationBase<'a>;

    /// Compute the results that are needed. Must not allocate results whose
    /// reference count is zero unless it releases them itself.
    fn execute(&mut self, inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError>;

    /// Set the initial reference count of every result from the number of
    /// scheduled inputs that read it.
    fn compute_results_reference_counts(
        &mut self,
        schedule: &Schedule,
    ) -> Result<(), CompositorError>;

    /// Human readable name used in logs.
    fn label(&self) -> String;

    /// Execute the operation, then release every input it reads.
    ///
    /// `upstream` holds the operations evaluated before this one; input
    /// mappings index into it. Panics if reference counts were not computed
    /// or the operation already ran.
    fn evaluate(
        &mut self,
        upstream: &mut [Box<dyn Operation<'a> + 'a>],
    ) -> Result<(), CompositorError> {
        assert_eq!(
            self.base().state(),
            OperationState::ReferenceCounted,
            "{} evaluated before its reference counts were computed or more than once",
            self.label()
        );
        let context = self.base().context();
        let mut inputs = InputResults {
            upstream,
            mapping: self.base().input_mapping().clone(),
            released: HashSet::new(),
            context,
        };
        self.execute(&mut inputs)?;
        inputs.release_all();
        self.base_mut().set_state(OperationState::Executed);
        Ok(())
    }

    fn get_result<'s>(&'s self, identifier: &str) -> &'s OperationResult
    where
        'a: 's,
    {
        self.base().get_result(identifier)
    }

    /// Free results nobody reads that the operation computed anyway.
    fn release_unconsumed_results(&mut self) {
        let context = self.base().context();
        let mut pool = context.texture_pool();
        for result in self.base_mut().results_mut().values_mut() {
            result.release_unconsumed(&mut pool);
        }
    }

    /// Return the storage of every result to the pool, whatever its count.
    /// Only for an aborted evaluation, where consumers will never run.
    fn discard_results(&mut self) {
        let context = self.base().context();
        let mut pool = context.texture_pool();
        for result in self.base_mut().results_mut().values_mut() {
            result.discard(&mut pool);
        }
    }
}
