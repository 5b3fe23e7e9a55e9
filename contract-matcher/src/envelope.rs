//! Envelope layers: specialized request matching selected by a contract's
//! tool discriminator.

use crate::contract::Contract;
use crate::engine::MatchContext;
use crate::stub::ObservedRequest;
use crate::verdict::MatchVerdict;

/// A matching layer for a payload carried inside a request body.
///
/// A layer replaces generic header and body matching for the contracts it
/// applies to; method, URL, query parameters and cookies are still matched
/// by the caller.
pub trait EnvelopeMatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this layer handles contracts with the given tool.
    fn is_applicable(&self, tool: &str) -> bool;

    /// Match the observed request's envelope against the contract.
    ///
    /// Never fails: every problem is recorded in the returned verdict.
    fn match_request(
        &self,
        contract: &Contract,
        observed: &ObservedRequest,
        ctx: &MatchContext<'_>,
    ) -> MatchVerdict;
}
