use foilrank::core::io::coefficients::read_case_record;
use foilrank::engine::case::{ANGLE_MARKER, REQUIRED_TEMPLATE_PATHS, VELOCITY_FIELD};
use foilrank::engine::config::{
    DetailedConfig, FieldSolverConfig, OutputConfig, PipelineConfig, PipelineConfigBuilder,
};
use foilrank::engine::error::EngineError;
use foilrank::engine::process::{ProcessOutput, ProcessRunner, ProcessSpec};
use foilrank::engine::progress::ProgressReporter;
use foilrank::workflows::{screen, verify};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::{TempDir, tempdir};

const TOLERANCE: f64 = 1e-9;

const VELOCITY_TEMPLATE: &str = "\
boundaryField
{
    inlet
    {
        type            freestreamVelocity;
        freestreamValue uniform (30 0 0);
        value           uniform (30 0 0);
    }
}
";

/// Lift, drag and moment of a synthetic section with a linear range and a clean stall.
fn aero(candidate: &str, alpha: f64) -> (f64, f64, f64) {
    let (cl0, slope, stall, cd0) = match candidate {
        "NACA2412" => (0.25, 0.105, 14.0, 0.0080),
        _ => (0.05, 0.095, 12.0, 0.0095),
    };
    let cl = if alpha <= stall {
        cl0 + slope * alpha
    } else {
        cl0 + slope * stall - 0.08 * (alpha - stall)
    };
    (cl, cd0 + 0.0004 * alpha * alpha, -0.05)
}

/// Stands in for both external solvers.
///
/// A run with piped stdin is the panel solver: it writes the polar named after `PACC` into
/// its working directory. Any other run is the field solver: it meshes the case in its
/// working directory and, depending on the composed command, writes the coefficient
/// history and surface samples. Candidates listed in `broken` produce nothing.
struct FakeSolvers {
    calls: AtomicUsize,
    broken: HashSet<String>,
}

impl FakeSolvers {
    fn new(broken: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            broken: broken.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn failure() -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "solution diverged".to_string(),
        }
    }

    fn panel(&self, cwd: &Path, script: &str) -> io::Result<ProcessOutput> {
        let lines: Vec<&str> = script.lines().collect();
        let name = lines[0]
            .trim_start_matches("LOAD ")
            .trim_end_matches(".dat")
            .to_string();
        if self.broken.contains(&name) {
            return Ok(Self::failure());
        }
        let pacc = lines.iter().position(|l| *l == "PACC").unwrap();
        let polar = lines[pacc + 1];

        let mut text = format!(
            "\n       XFOIL         Version 6.99\n\n Calculated polar for: {}\n\n   alpha    CL        CD       CDp       CM     Top_Xtr  Bot_Xtr\n  ------ -------- --------- --------- -------- -------- --------\n",
            name
        );
        for a in -5..=18 {
            let alpha = f64::from(a);
            let (cl, cd, cm) = aero(&name, alpha);
            text.push_str(&format!(
                "  {:6.3} {:8.4} {:9.5} {:9.5} {:8.4} {:8.4} {:8.4}\n",
                alpha,
                cl,
                cd,
                cd * 0.4,
                cm,
                0.6,
                0.9
            ));
        }
        fs::write(cwd.join(polar), text)?;
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }

    fn field(&self, case: &Path, command: &str) -> io::Result<ProcessOutput> {
        let family_dir = case.parent().unwrap().file_name().unwrap().to_string_lossy();
        let candidate = family_dir.trim_end_matches("_detailed").to_string();
        if self.broken.contains(&candidate) {
            return Ok(Self::failure());
        }
        let alpha: f64 = fs::read_to_string(case.join(ANGLE_MARKER))?.trim().parse().unwrap();

        fs::create_dir_all(case.join("constant/polyMesh"))?;
        if command.contains("simpleFoam") {
            let (cl, cd, cm) = aero(&candidate, alpha);
            let dir = case.join("postProcessing/force_coefficient/0");
            fs::create_dir_all(&dir)?;
            fs::write(
                dir.join("coefficient.dat"),
                format!(
                    "# Force coefficients\n# Time Cd Cs Cl CmRoll CmPitch CmYaw\n1 0.5 0 0.1 0 0 0\n500 {} 0 {} 0 {} 0\n",
                    cd, cl, cm
                ),
            )?;
        }
        if command.contains("foamToVTK") {
            let dir = case.join("postProcessing/surfaces/500");
            fs::create_dir_all(&dir)?;
            let amplitude = if candidate == "NACA2412" { 1.1 } else { 1.6 };
            let rows: String = (0..20)
                .map(|i| {
                    let x = f64::from(i) / 19.0;
                    format!("{} 0 0 {}\n", x * 0.1969, 1.0 - amplitude * (1.0 - x) * (1.0 + 0.05 * alpha))
                })
                .collect();
            fs::write(dir.join("airfoil_cp.raw"), format!("# x y z p\n{}", rows))?;
        }
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }
}

impl ProcessRunner for FakeSolvers {
    fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let cwd = spec.cwd.clone().expect("solvers always run in a working directory");
        match &spec.stdin {
            Some(script) => self.panel(&cwd, script),
            None => self.field(&cwd, spec.args.last().map(String::as_str).unwrap_or("")),
        }
    }
}

fn write_template(root: &Path) {
    for rel in REQUIRED_TEMPLATE_PATHS
        .iter()
        .chain(["system/blockMeshDict", "system/snappyHexMeshDict"].iter())
    {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
    }
    fs::write(root.join(VELOCITY_FIELD), VELOCITY_TEMPLATE).unwrap();
}

fn write_geometry(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(
            dir.join(format!("{}.dat", name.to_lowercase())),
            format!("{}\n1.0 0.0\n0.5 0.06\n0.0 0.0\n0.5 -0.03\n1.0 0.0\n", name),
        )
        .unwrap();
    }
}

struct Study {
    dir: TempDir,
    config: PipelineConfig,
}

impl Study {
    fn new(candidates: &[&str], with_geometry: &[&str], detailed_template: bool) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_geometry(&root.join("geometry"), with_geometry);
        write_template(&root.join("baseCase"));
        if detailed_template {
            write_template(&root.join("baseCase_detailed"));
        }

        let config = PipelineConfigBuilder::new()
            .candidates(candidates.iter().map(|s| s.to_string()).collect())
            .geometry_dir(root.join("geometry"))
            .field(FieldSolverConfig {
                template_dir: root.join("baseCase"),
                cases_root: root.join("cases"),
                angles: (-4..=16).map(f64::from).collect(),
                ..Default::default()
            })
            .detailed(DetailedConfig {
                template_dir: root.join("baseCase_detailed"),
                angles: vec![0.0, 2.0, 4.0, 6.0, 8.0],
                ..Default::default()
            })
            .output(OutputConfig {
                raw_dir: root.join("data/raw"),
                processed_dir: root.join("data/processed"),
                ..Default::default()
            })
            .build()
            .unwrap();
        Self { dir, config }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

#[test]
fn screening_ranks_usable_candidates_and_reports_the_rest() {
    let study = Study::new(
        &["NACA2412", "E168", "MISSING", "BROKEN"],
        &["NACA2412", "E168", "BROKEN"],
        true,
    );
    let runner = FakeSolvers::new(&["BROKEN"]);

    let result = screen::run(&study.config, &runner, &ProgressReporter::new()).unwrap();

    assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.tables.len(), 2);
    assert_eq!(result.tables[0].len(), 24);
    let failed: HashSet<&str> = result.failures.iter().map(|f| f.case.as_str()).collect();
    assert_eq!(failed, HashSet::from(["MISSING", "BROKEN"]));

    let scores = &result.ranking.scores;
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].rank, 1);
    assert_eq!(scores[1].rank, 2);
    assert!(scores[0].composite >= scores[1].composite);
    for s in scores {
        assert!((0.0..=1.0).contains(&s.composite));
    }

    let naca = result
        .ranking
        .metrics
        .iter()
        .find(|m| m.airfoil == "NACA2412")
        .unwrap();
    assert_eq!(naca.alpha_stall, Some(14.0));
    assert!((naca.lift_curve_slope.unwrap() - 0.105).abs() < 1e-3);

    assert!(study.path("data/raw/NACA2412.dat").is_file());
    assert!(study.path("data/processed/NACA2412_polar.csv").is_file());
    assert!(!study.path("data/processed/BROKEN_polar.csv").exists());
    assert!(study.path("data/processed/screening/results.csv").is_file());
    assert!(study.path("data/processed/screening/metrics.csv").is_file());
    assert!(study.path("data/processed/screening/scores.csv").is_file());
}

#[test]
fn screening_without_any_polar_is_terminal() {
    let study = Study::new(&["BROKEN"], &["BROKEN"], true);
    let runner = FakeSolvers::new(&["BROKEN"]);

    let result = screen::run(&study.config, &runner, &ProgressReporter::new());
    assert!(matches!(
        result,
        Err(EngineError::NoUsableRecords { stage: "screening" })
    ));
    assert!(!study.path("data/processed/screening/scores.csv").exists());
}

#[test]
fn verification_runs_every_case_and_the_detailed_stage() {
    let study = Study::new(&["NACA2412", "E168"], &["NACA2412", "E168"], true);
    let runner = FakeSolvers::new(&[]);

    let result = verify::run(
        &study.config,
        &verify::VerifyOptions::default(),
        &runner,
        &ProgressReporter::new(),
    )
    .unwrap();

    assert!(result.failures.is_empty(), "{:?}", result.failures);
    assert_eq!(result.completed_cases, 2 * 21 + 2 * 5);
    assert_eq!(result.tables.len(), 2);
    assert!(result.tables.iter().all(|t| t.len() == 21));

    let case = study.path("cases/NACA2412/alpha_4");
    assert_eq!(fs::read_to_string(case.join(ANGLE_MARKER)).unwrap(), "4\n");
    assert!(case.join("constant/triSurface/airfoil.stl").is_file());
    let record = read_case_record(&case.join("postProcessing/force_coefficient/0/coefficient.dat"), 4.0).unwrap();
    assert!((record.cl() - aero("NACA2412", 4.0).0).abs() < TOLERANCE);
    assert!(study.path("cases/E168_detailed/alpha_8").is_dir());

    assert_eq!(result.pressure.len(), 2);
    for row in &result.pressure {
        assert!(row.detailed_alpha.is_some());
        assert!(row.detail_score.is_some());
    }
    assert_eq!(result.detailed_scores.len(), 2);
    for s in &result.detailed_scores {
        assert!(s.detailed_composite.is_some());
        assert!(!s.detail_imputed);
    }

    for file in ["results.csv", "metrics.csv", "scores.csv", "pressure_metrics.csv", "scores_detailed.csv"] {
        assert!(study.path("data/processed/verification").join(file).is_file(), "{}", file);
    }
}

#[test]
fn failed_cases_are_isolated_from_their_siblings() {
    let study = Study::new(
        &["NACA2412", "BROKEN", "E168"],
        &["NACA2412", "BROKEN", "E168"],
        true,
    );
    let runner = FakeSolvers::new(&["BROKEN"]);
    let options = verify::VerifyOptions {
        detailed: false,
        ..Default::default()
    };

    let result = verify::run(&study.config, &options, &runner, &ProgressReporter::new()).unwrap();

    assert_eq!(result.tables.len(), 2);
    assert_eq!(result.failures.len(), 21);
    assert!(result.failures.iter().all(|f| f.case.starts_with("BROKEN@")));
    assert!(result.detailed_scores.is_empty());
    assert!(!study.path("data/processed/verification/scores_detailed.csv").exists());
}

#[test]
fn rerun_does_not_reuse_coefficients_from_the_previous_run() {
    let study = Study::new(&["NACA2412", "E168"], &["NACA2412", "E168"], true);
    let options = verify::VerifyOptions {
        detailed: false,
        ..Default::default()
    };
    let first = verify::run(
        &study.config,
        &options,
        &FakeSolvers::new(&[]),
        &ProgressReporter::new(),
    )
    .unwrap();
    assert_eq!(first.tables.len(), 2);

    let second = verify::run(
        &study.config,
        &options,
        &FakeSolvers::new(&["E168"]),
        &ProgressReporter::new(),
    )
    .unwrap();

    assert_eq!(second.tables.len(), 1);
    assert_eq!(second.tables[0].candidate(), "NACA2412");
    assert_eq!(second.failures.len(), 21);
    assert!(second.failures.iter().all(|f| f.case.starts_with("E168@")));
    assert!(
        !study
            .path("cases/E168/alpha_4/postProcessing/force_coefficient/0/coefficient.dat")
            .exists()
    );
}

#[test]
fn post_processing_reuses_existing_results_without_running_solvers() {
    let study = Study::new(&["NACA2412", "E168"], &["NACA2412", "E168"], true);
    let first = verify::run(
        &study.config,
        &verify::VerifyOptions::default(),
        &FakeSolvers::new(&[]),
        &ProgressReporter::new(),
    )
    .unwrap();

    let runner = FakeSolvers::new(&[]);
    let options = verify::VerifyOptions {
        mode: verify::ExecutionMode::PostProcessOnly,
        ..Default::default()
    };
    let second = verify::run(&study.config, &options, &runner, &ProgressReporter::new()).unwrap();

    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.completed_cases, 0);
    let order = |scores: &[foilrank::core::analysis::scoring::ScoreRecord]| {
        scores.iter().map(|s| s.airfoil.clone()).collect::<Vec<_>>()
    };
    assert_eq!(order(&first.ranking.scores), order(&second.ranking.scores));
    assert_eq!(order(&first.detailed_scores), order(&second.detailed_scores));
}

#[test]
fn mesh_only_meshes_every_case_without_scoring() {
    let study = Study::new(&["NACA2412", "E168"], &["NACA2412", "E168"], true);
    let options = verify::VerifyOptions {
        mode: verify::ExecutionMode::MeshOnly,
        ..Default::default()
    };

    let result = verify::run(&study.config, &options, &FakeSolvers::new(&[]), &ProgressReporter::new()).unwrap();

    assert_eq!(result.completed_cases, 2 * 21 + 2 * 5);
    assert!(result.tables.is_empty());
    assert!(result.ranking.scores.is_empty());
    assert!(study.path("cases/E168/alpha_-4/constant/polyMesh").is_dir());
    assert!(!study.path("cases/E168/alpha_-4/postProcessing").exists());
    assert!(!study.path("data/processed/verification/scores.csv").exists());
}

#[test]
fn missing_detailed_template_halts_only_the_detailed_family() {
    let study = Study::new(&["NACA2412", "E168"], &["NACA2412", "E168"], false);

    let result = verify::run(
        &study.config,
        &verify::VerifyOptions::default(),
        &FakeSolvers::new(&[]),
        &ProgressReporter::new(),
    )
    .unwrap();

    assert_eq!(result.completed_cases, 2 * 21);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].case, "detailed");
    assert!(result.failures[0].reason.contains("baseCase_detailed"));
    assert!(!study.path("cases/NACA2412_detailed").exists());

    for s in &result.detailed_scores {
        assert_eq!(s.detailed_composite, Some(s.composite));
        assert_eq!(s.detail_score, None);
    }
}
