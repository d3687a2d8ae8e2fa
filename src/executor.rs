//! Circuit sweep executors.
//!
//! An executor turns one circuit plus a list of parameter resolvers into one
//! [`RunResult`] per resolver, in order. The three strategies differ in
//! where parameters are bound and whether quilc runs:
//!
//! | Executor | Parameters bound | Compilations |
//! |----------|------------------|--------------|
//! | [`WithQuilcCompilationAndParameterResolution`] | before transformation | one per resolver |
//! | [`WithoutQuilcCompilation`] | before transformation | none |
//! | [`WithQuilcParametricCompilation`] | in QAM memory | one per sweep |

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::circuit::{Circuit, Param};
use crate::error::{QcsError, QcsResult};
use crate::program::{MemoryMap, Program};
use crate::quantum_computer::{QuantumComputer, ValidationResult};
use crate::resolver::ParamResolver;
use crate::result::RunResult;
use crate::transformer::CircuitTransformer;

/// Runs a circuit across a parameter sweep.
#[async_trait]
pub trait CircuitSweepExecutor: Send + Sync {
    async fn execute(
        &self,
        quantum_computer: &QuantumComputer,
        circuit: &Circuit,
        resolvers: &[ParamResolver],
        repetitions: u32,
        transformer: &dyn CircuitTransformer,
    ) -> QcsResult<Vec<RunResult>>;
}

/// The default executor.
pub fn default_executor() -> Arc<dyn CircuitSweepExecutor> {
    Arc::new(WithQuilcCompilationAndParameterResolution)
}

/// Resolve, transform, compile and run once per resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithQuilcCompilationAndParameterResolution;

/// Resolve, transform and run once per resolver, skipping compilation.
///
/// Programs must already be native to the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithoutQuilcCompilation;

/// Transform and compile once with symbols left as memory references, then
/// run once per resolver with the values written into memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithQuilcParametricCompilation;

fn check_repetitions(qc: &QuantumComputer, repetitions: u32) -> QcsResult<()> {
    let max = qc.capabilities().max_shots;
    if repetitions == 0 || repetitions > max {
        return Err(QcsError::InvalidShots(format!(
            "repetitions must be 1..={max}, got {repetitions}"
        )));
    }
    Ok(())
}

/// Reject invalid programs; also reject programs that need compilation
/// when `compiling` is false.
fn check_program(qc: &QuantumComputer, program: &Program, compiling: bool) -> QcsResult<()> {
    match qc.validate(program) {
        ValidationResult::Valid => Ok(()),
        ValidationResult::Invalid { reasons } => {
            Err(QcsError::InvalidCircuit(reasons.join("; ")))
        }
        ValidationResult::RequiresTranspilation { .. } if compiling => Ok(()),
        ValidationResult::RequiresTranspilation { details } => Err(QcsError::InvalidCircuit(
            format!("program requires compilation for {}: {details}", qc.name()),
        )),
    }
}

async fn resolve_and_run(
    qc: &QuantumComputer,
    circuit: &Circuit,
    resolvers: &[ParamResolver],
    repetitions: u32,
    transformer: &dyn CircuitTransformer,
    compile: bool,
) -> QcsResult<Vec<RunResult>> {
    check_repetitions(qc, repetitions)?;
    circuit.check()?;

    let mut results = Vec::with_capacity(resolvers.len());
    for (i, resolver) in resolvers.iter().enumerate() {
        let resolved = circuit.resolve(resolver)?;
        let output = transformer.transform(&resolved)?;
        check_program(qc, &output.program, compile)?;

        let executable = if compile {
            qc.compile(&output.program).await?
        } else {
            output.program
        };
        debug!(qc = %qc.name(), sweep_index = i, compile, "executing resolved circuit");

        let data = qc.run(&executable, repetitions, &MemoryMap::default()).await?;
        results.push(RunResult::from_execution_data(
            resolver.clone(),
            &output.registers,
            &data,
            repetitions,
        )?);
    }
    Ok(results)
}

#[async_trait]
impl CircuitSweepExecutor for WithQuilcCompilationAndParameterResolution {
    async fn execute(
        &self,
        quantum_computer: &QuantumComputer,
        circuit: &Circuit,
        resolvers: &[ParamResolver],
        repetitions: u32,
        transformer: &dyn CircuitTransformer,
    ) -> QcsResult<Vec<RunResult>> {
        resolve_and_run(
            quantum_computer,
            circuit,
            resolvers,
            repetitions,
            transformer,
            true,
        )
        .await
    }
}

#[async_trait]
impl CircuitSweepExecutor for WithoutQuilcCompilation {
    async fn execute(
        &self,
        quantum_computer: &QuantumComputer,
        circuit: &Circuit,
        resolvers: &[ParamResolver],
        repetitions: u32,
        transformer: &dyn CircuitTransformer,
    ) -> QcsResult<Vec<RunResult>> {
        resolve_and_run(
            quantum_computer,
            circuit,
            resolvers,
            repetitions,
            transformer,
            false,
        )
        .await
    }
}

#[async_trait]
impl CircuitSweepExecutor for WithQuilcParametricCompilation {
    async fn execute(
        &self,
        quantum_computer: &QuantumComputer,
        circuit: &Circuit,
        resolvers: &[ParamResolver],
        repetitions: u32,
        transformer: &dyn CircuitTransformer,
    ) -> QcsResult<Vec<RunResult>> {
        check_repetitions(quantum_computer, repetitions)?;
        circuit.check()?;
        if resolvers.is_empty() {
            return Ok(vec![]);
        }

        let symbols = circuit.parameters();
        let output = transformer.transform(circuit)?;
        check_program(quantum_computer, &output.program, true)?;
        let executable = quantum_computer.compile(&output.program).await?;
        debug!(
            qc = %quantum_computer.name(),
            symbols = symbols.len(),
            sweep = resolvers.len(),
            "compiled parametric program"
        );

        let mut results = Vec::with_capacity(resolvers.len());
        for resolver in resolvers {
            let memory = symbols
                .iter()
                .map(|symbol| {
                    resolver
                        .resolve(&Param::symbol(symbol.as_str()))
                        .map(|value| (symbol.clone(), vec![value]))
                })
                .collect::<QcsResult<MemoryMap>>()?;

            let data = quantum_computer
                .run(&executable, repetitions, &memory)
                .await?;
            results.push(RunResult::from_execution_data(
                resolver.clone(),
                &output.registers,
                &data,
                repetitions,
            )?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::resolver::linspace;
    use crate::testing::{EchoCompiler, MockApi, RecordingQam};
    use crate::transformer::default_transformer;

    struct Harness {
        qc: QuantumComputer,
        qam: Arc<RecordingQam>,
        compiler: Arc<EchoCompiler>,
    }

    fn harness(capabilities: Capabilities) -> Harness {
        let qam = Arc::new(RecordingQam::new());
        let compiler = Arc::new(EchoCompiler::default());
        let qc = QuantumComputer::new(
            capabilities.name.clone(),
            capabilities,
            compiler.clone(),
            qam.clone(),
        );
        Harness { qc, qam, compiler }
    }

    fn rotation_circuit() -> Circuit {
        Circuit::new().rx(0, "theta").measure([0, 1], "m")
    }

    #[tokio::test]
    async fn test_default_executor_compiles_per_resolver() {
        let h = harness(Capabilities::generic_qvm(2));
        let sweep = linspace("theta", 0.0, 1.0, 3);

        let results = default_executor()
            .execute(&h.qc, &rotation_circuit(), &sweep, 4, default_transformer().as_ref())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(h.compiler.calls(), 3);
        let submitted = h.qam.submitted();
        assert_eq!(submitted.len(), 3);
        assert!(submitted[2].0.contains("RX(1.0) 0"));
        assert!(!submitted[0].0.contains("DECLARE theta"));

        assert_eq!(results[1].params.value_of("theta"), Some(0.5));
        let hist = results[0].histogram("m").unwrap();
        assert_eq!(hist.get("00"), 2);
        assert_eq!(hist.get("11"), 2);
    }

    #[tokio::test]
    async fn test_without_quilc_skips_compiler() {
        let h = harness(Capabilities::generic_qvm(2));
        let resolvers = [ParamResolver::from_pairs([("theta", 0.1)])];

        let results = WithoutQuilcCompilation
            .execute(&h.qc, &rotation_circuit(), &resolvers, 2, default_transformer().as_ref())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(h.compiler.calls(), 0);
    }

    #[tokio::test]
    async fn test_without_quilc_rejects_non_native_program() {
        let capabilities = Capabilities::from_isa(&MockApi::linear_isa("Ankaa-9Q-3", 3));
        let h = harness(capabilities);
        let circuit = Circuit::new().h(0).measure([0], "m");

        let err = WithoutQuilcCompilation
            .execute(&h.qc, &circuit, &[ParamResolver::new()], 2, default_transformer().as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, QcsError::InvalidCircuit(_)));
        assert!(h.qam.submitted().is_empty());

        let ok = WithQuilcCompilationAndParameterResolution
            .execute(&h.qc, &circuit, &[ParamResolver::new()], 2, default_transformer().as_ref())
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_parametric_compiles_once() {
        let h = harness(Capabilities::generic_qvm(2));
        let sweep = linspace("theta", 0.0, 2.0, 3);

        let results = WithQuilcParametricCompilation
            .execute(&h.qc, &rotation_circuit(), &sweep, 2, default_transformer().as_ref())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(h.compiler.calls(), 1);
        let submitted = h.qam.submitted();
        assert!(submitted[0].0.contains("MOVE theta[0] 0.0"));
        assert!(submitted[1].0.contains("MOVE theta[0] 1.0"));
        assert!(submitted[2].0.contains("MOVE theta[0] 2.0"));
    }

    #[tokio::test]
    async fn test_parametric_missing_symbol() {
        let h = harness(Capabilities::generic_qvm(2));
        let transformer = default_transformer();
        let err = WithQuilcParametricCompilation
            .execute(
                &h.qc,
                &rotation_circuit(),
                &[ParamResolver::new()],
                2,
                transformer.as_ref(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QcsError::UnresolvedParameter(s) if s == "theta"));
    }

    #[tokio::test]
    async fn test_invalid_repetitions_and_qubits() {
        let h = harness(Capabilities::generic_qvm(2));
        let transformer = default_transformer();
        let resolvers = [ParamResolver::from_pairs([("theta", 0.0)])];
        let err = default_executor()
            .execute(&h.qc, &rotation_circuit(), &resolvers, 0, transformer.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, QcsError::InvalidShots(_)));

        let too_wide = Circuit::new().x(5).measure([5], "m");
        let err = default_executor()
            .execute(&h.qc, &too_wide, &[ParamResolver::new()], 1, transformer.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, QcsError::InvalidCircuit(_)));
    }

    #[tokio::test]
    async fn test_rejects_repeated_qubits_and_non_finite_angles() {
        let h = harness(Capabilities::generic_qvm(2));
        let transformer = default_transformer();
        let executors = [
            default_executor(),
            Arc::new(WithoutQuilcCompilation) as Arc<dyn CircuitSweepExecutor>,
            Arc::new(WithQuilcParametricCompilation) as Arc<dyn CircuitSweepExecutor>,
        ];

        for executor in &executors {
            let err = executor
                .execute(
                    &h.qc,
                    &Circuit::new().cnot(0, 0).measure([0], "m"),
                    &[ParamResolver::new()],
                    1,
                    transformer.as_ref(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, QcsError::InvalidCircuit(msg) if msg.contains("repeated")));

            let nan = [ParamResolver::from_pairs([("theta", f64::NAN)])];
            let err = executor
                .execute(&h.qc, &rotation_circuit(), &nan, 1, transformer.as_ref())
                .await
                .unwrap_err();
            assert!(matches!(err, QcsError::InvalidCircuit(_)));
        }
        assert!(h.qam.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_empty_sweep() {
        let h = harness(Capabilities::generic_qvm(2));
        for executor in [
            default_executor(),
            Arc::new(WithoutQuilcCompilation) as Arc<dyn CircuitSweepExecutor>,
            Arc::new(WithQuilcParametricCompilation) as Arc<dyn CircuitSweepExecutor>,
        ] {
            let results = executor
                .execute(&h.qc, &rotation_circuit(), &[], 1, default_transformer().as_ref())
                .await
                .unwrap();
            assert!(results.is_empty());
        }
        assert!(h.qam.submitted().is_empty());
    }
}
