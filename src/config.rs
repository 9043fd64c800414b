//! Host-tunable interpreter behavior (§4.10): the handful of places where the
//! Z-machine format is ambiguous or where real story files lean on
//! technically-illegal behavior that most interpreters tolerate anyway.

/// Knobs a host sets once when constructing an `Interpreter`. All default to
/// the permissive, real-world-compatible behavior.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterConfig {
    /// `get_prop` on a property whose encoded size is neither 1 nor 2 bytes:
    /// when `true`, read the first two bytes as a `u16` and log a warning
    /// instead of raising `IllegalOperand`. Some Infocom-era games do this.
    pub forgiving_get_prop: bool,
    /// Fixed seed for the `random` opcode's negative-argument "reseed" form;
    /// `None` uses OS entropy.
    pub rng_seed: Option<u64>,
    /// Accept (and ignore) the timed-interrupt operands to `aread`/`read_char`
    /// instead of treating them as a `Malformed` instruction.
    pub skip_unimplemented_interrupts: bool,
}

impl Default for InterpreterConfig {
    fn default() -> InterpreterConfig {
        InterpreterConfig {
            forgiving_get_prop: true,
            rng_seed: None,
            skip_unimplemented_interrupts: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let cfg = InterpreterConfig::default();
        assert!(cfg.forgiving_get_prop);
        assert!(cfg.skip_unimplemented_interrupts);
        assert_eq!(cfg.rng_seed, None);
    }
}
