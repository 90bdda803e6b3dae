//! Feeds the generated headers to the system C and C++ compilers and runs
//! the result.
//!
//! Needs `cc` with C11 `<stdatomic.h>`, `c++` with C++11 `<atomic>`, and
//! pthreads. A test returns early when its compiler is not installed.

use atomic_gen::catalog::{OpKind, Parameter, OPERATIONS};
use atomic_gen::codegen::{generate_header, generate_sizes};
use atomic_gen::config::{GeneratorConfig, Variant};
use atomic_gen::registry::{DataModel, SCALAR_TYPES};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const C11_CONFIG_H: &str = "#define EMBB_PLATFORM_INLINE static inline
#define EMBB_PLATFORM_ARCH_C11
";

const CXX11_CONFIG_H: &str = "#define EMBB_PLATFORM_INLINE static inline
#define EMBB_PLATFORM_ARCH_CXX11
";

const LEGACY_CONFIG_H: &str = "#define EMBB_PLATFORM_INLINE static inline
#define EMBB_PLATFORM_ARCH_X86
";

const BARE_CONFIG_H: &str = "#define EMBB_PLATFORM_INLINE static inline
";

const MACRO_HELPER_H: &str = "#define EMBB_CAT2_(a, b) a##b
#define EMBB_XCAT2(a, b) EMBB_CAT2_(a, b)
";

const MUTEX_H: &str = "#include <pthread.h>
typedef pthread_mutex_t embb_mutex_t;
#define EMBB_MUTEX_PLAIN 0
static inline int embb_mutex_init(embb_mutex_t* m, int type) {
  (void)type;
  return pthread_mutex_init(m, 0);
}
static inline int embb_mutex_lock(embb_mutex_t* m) { return pthread_mutex_lock(m); }
static inline int embb_mutex_unlock(embb_mutex_t* m) { return pthread_mutex_unlock(m); }
static inline void embb_mutex_destroy(embb_mutex_t* m) { pthread_mutex_destroy(m); }
";

/// Hand-written cases with known results. Valid as both C and C++.
const SCENARIOS: &str = r#"#define CHECK(cond, what) \
  do { if (!(cond)) { fprintf(stderr, "failed: %s\n", what); return 1; } } while (0)

static int check_scenarios(void) {
  {
    embb_atomic_unsigned_int cell;
    unsigned int expected = 8;
    embb_atomic_init_unsigned_int(&cell, 5);
    CHECK(embb_atomic_fetch_and_add_unsigned_int(&cell, 3) == 5, "fetch_and_add returns previous");
    CHECK(embb_atomic_load_unsigned_int(&cell) == 8, "fetch_and_add stores sum");
    CHECK(embb_atomic_compare_and_swap_unsigned_int(&cell, &expected, 10), "cas succeeds");
    CHECK(expected == 8, "successful cas leaves expected alone");
    CHECK(embb_atomic_load_unsigned_int(&cell) == 10, "cas stores desired");
    expected = 8;
    CHECK(!embb_atomic_compare_and_swap_unsigned_int(&cell, &expected, 10), "stale cas fails");
    CHECK(expected == 10, "failed cas writes back current value");
    CHECK(embb_atomic_load_unsigned_int(&cell) == 10, "failed cas leaves cell alone");
    embb_atomic_memory_barrier();
    embb_atomic_destroy_unsigned_int(&cell);
  }
  {
    embb_atomic_char cell;
    embb_atomic_init_char(&cell, (char)0x0F);
    embb_atomic_xor_assign_char(&cell, (char)0xFF);
    CHECK(embb_atomic_load_char(&cell) == (char)0xF0, "char xor flips to 0xF0");
    embb_atomic_xor_assign_char(&cell, (char)0xFF);
    CHECK(embb_atomic_load_char(&cell) == (char)0x0F, "char xor flips back to 0x0F");
    embb_atomic_destroy_char(&cell);
  }
  {
    embb_atomic_long cell;
    long expected = -1;
    embb_atomic_init_long(&cell, -1);
    CHECK(embb_atomic_swap_long(&cell, -42) == -1, "swap returns previous");
    CHECK(embb_atomic_swap_long(&cell, 7) == -42, "swap returns negative previous");
    CHECK(!embb_atomic_compare_and_swap_long(&cell, &expected, 0), "signed stale cas fails");
    CHECK(expected == 7, "signed failed cas writes back current value");
    CHECK(embb_atomic_load_long(&cell) == 7, "swap stores new value");
    embb_atomic_destroy_long(&cell);
  }
  {
    embb_atomic_unsigned_short cell;
    embb_atomic_init_unsigned_short(&cell, 65530);
    CHECK(embb_atomic_fetch_and_add_unsigned_short(&cell, 10) == 65530, "wrapping add returns previous");
    CHECK(embb_atomic_load_unsigned_short(&cell) == 4, "unsigned short add wraps");
    embb_atomic_destroy_unsigned_short(&cell);
  }
  {
    embb_atomic_short cell;
    embb_atomic_init_short(&cell, -3);
    CHECK(embb_atomic_fetch_and_add_short(&cell, 5) == -3, "short add returns negative previous");
    embb_atomic_or_assign_short(&cell, (short)-256);
    CHECK(embb_atomic_load_short(&cell) == -254, "short or keeps sign bits");
    embb_atomic_and_assign_short(&cell, 0x00FF);
    CHECK(embb_atomic_load_short(&cell) == 2, "short and clears high byte");
    embb_atomic_destroy_short(&cell);
  }
  return 0;
}
"#;

/// Value the cell holds or returns after each step of the per-type sequence
/// `init 0, and 1, cas 0->1, fetch_and_add 1, load, or 1, store 1, swap 1,
/// xor 1`. `None` for steps that return nothing to compare.
fn expected_return(kind: OpKind) -> Option<&'static str> {
    match kind {
        OpKind::FetchAndAdd => Some("1"),
        OpKind::Load => Some("2"),
        OpKind::Swap => Some("1"),
        _ => None,
    }
}

/// One function per type calling every public operation once, in catalog
/// order, then `main` running them after the scenarios.
fn harness_source() -> String {
    let mut out = String::from("#include <stdio.h>\n#include \"atomic.h\"\n\n");
    out.push_str(SCENARIOS);

    for ty in &SCALAR_TYPES {
        let designator = ty.designator();
        out.push_str(&format!("\nstatic int exercise_{}(void) {{\n", designator));
        out.push_str(&format!("  embb_atomic_{} cell;\n", designator));
        out.push_str(&format!("  {} expected = 0;\n", ty.name));
        for op in &OPERATIONS {
            let mut args = String::from("&cell");
            for param in op.params {
                args.push_str(match param {
                    Parameter::Value | Parameter::Desired => ", 1",
                    Parameter::Expected => ", &expected",
                });
            }
            let call = format!("embb_atomic_{}_{}({})", op.stem, designator, args);
            let what = format!("{} {}", op.stem, ty.name);
            match (op.kind, expected_return(op.kind)) {
                (OpKind::CompareAndSwap, _) => {
                    out.push_str(&format!("  CHECK({}, \"{}\");\n", call, what));
                }
                (_, Some(value)) => {
                    out.push_str(&format!(
                        "  CHECK({} == ({}){}, \"{}\");\n",
                        call, ty.name, value, what
                    ));
                }
                (OpKind::Destroy, None) => {
                    out.push_str(&format!(
                        "  CHECK(embb_atomic_load_{}(&cell) == 0, \"final value {}\");\n",
                        designator, ty.name
                    ));
                    out.push_str(&format!("  {};\n", call));
                }
                (_, None) => out.push_str(&format!("  {};\n", call)),
            }
        }
        out.push_str("  return 0;\n}\n");
    }

    out.push_str("\nint main(void) {\n  if (check_scenarios()) return 1;\n");
    for ty in &SCALAR_TYPES {
        out.push_str(&format!("  if (exercise_{}()) return 1;\n", ty.designator()));
    }
    out.push_str("  return 0;\n}\n");
    out
}

#[derive(Clone, Copy)]
enum Language {
    C11,
    Cxx11,
}

impl Language {
    fn compiler(self) -> &'static str {
        match self {
            Language::C11 => "cc",
            Language::Cxx11 => "c++",
        }
    }

    fn standard(self) -> &'static str {
        match self {
            Language::C11 => "-std=c11",
            Language::Cxx11 => "-std=c++11",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Language::C11 => "main.c",
            Language::Cxx11 => "main.cpp",
        }
    }

    fn is_installed(self) -> bool {
        let found = Command::new(self.compiler())
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        if !found {
            eprintln!("skipping: `{}` not found", self.compiler());
        }
        found
    }
}

fn host_data_model() -> DataModel {
    if cfg!(target_pointer_width = "32") {
        DataModel::Ilp32
    } else if cfg!(windows) {
        DataModel::Llp64
    } else {
        DataModel::Lp64
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("atomic-gen-{}-{}", name, std::process::id()));
    fs::create_dir_all(dir.join("embb/base/c/internal/atomic")).unwrap();
    fs::write(dir.join("embb/base/c/internal/macro_helper.h"), MACRO_HELPER_H).unwrap();
    fs::write(dir.join("embb/base/c/mutex.h"), MUTEX_H).unwrap();
    dir
}

/// Writes the support headers and the harness into `dir` and runs the
/// compiler over it.
fn build(dir: &Path, language: Language, header: &str, config_h: &str, flags: &[&str]) -> Output {
    let sizes = generate_sizes(&GeneratorConfig::default(), host_data_model()).unwrap();
    fs::write(dir.join("embb/base/c/internal/config.h"), config_h).unwrap();
    fs::write(dir.join("embb/base/c/internal/atomic/atomic_sizes.h"), sizes).unwrap();
    fs::write(dir.join("atomic.h"), header).unwrap();
    fs::write(dir.join(language.source()), harness_source()).unwrap();

    Command::new(language.compiler())
        .current_dir(dir)
        .args([language.standard(), "-Wall", "-I", ".", "-o", "main", language.source(), "-pthread"])
        .args(flags)
        .output()
        .unwrap()
}

fn compile_and_run(name: &str, language: Language, variant: Variant, config_h: &str, flags: &[&str]) {
    if !language.is_installed() {
        return;
    }
    let dir = scratch_dir(name);
    let config = GeneratorConfig::new("embb", variant).unwrap();
    let output = build(&dir, language, &generate_header(&config).unwrap(), config_h, flags);
    assert!(
        output.status.success(),
        "{} failed:\n{}",
        language.compiler(),
        String::from_utf8_lossy(&output.stderr)
    );
    let run = Command::new(dir.join("main")).output().unwrap();
    assert!(
        run.status.success(),
        "generated operations misbehaved ({}):\n{}",
        run.status,
        String::from_utf8_lossy(&run.stderr)
    );
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_harness_calls_every_operation_for_every_type() {
    let source = harness_source();
    for ty in &SCALAR_TYPES {
        for op in &OPERATIONS {
            let name = format!("embb_atomic_{}_{}(&cell", op.stem, ty.designator());
            assert!(source.contains(&name), "harness never calls {}", name);
        }
        assert!(source.contains(&format!("if (exercise_{}()) return 1;", ty.designator())));
    }
    assert!(source.contains("CHECK(expected == 10, \"failed cas writes back current value\");"));
}

#[test]
fn test_full_header_compiles_as_c11() {
    compile_and_run("full-c11", Language::C11, Variant::Full, C11_CONFIG_H, &[]);
}

#[test]
fn test_standard_header_compiles_as_c11() {
    compile_and_run("standard-c11", Language::C11, Variant::StandardOnly, C11_CONFIG_H, &[]);
}

#[test]
fn test_full_header_compiles_as_cxx11() {
    compile_and_run("full-cxx11", Language::Cxx11, Variant::Full, CXX11_CONFIG_H, &[]);
}

#[test]
fn test_standard_header_compiles_as_cxx11() {
    compile_and_run("standard-cxx11", Language::Cxx11, Variant::StandardOnly, CXX11_CONFIG_H, &[]);
}

#[test]
fn test_full_header_compiles_with_lock_fallback() {
    // The fallback fence is inline assembly for x86.
    if !cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
        return;
    }
    compile_and_run("legacy", Language::C11, Variant::Full, LEGACY_CONFIG_H, &["-DEMBB_DEBUG"]);
}

#[test]
fn test_analysis_mode_adds_cell_locks() {
    compile_and_run(
        "analysis",
        Language::C11,
        Variant::Full,
        C11_CONFIG_H,
        &["-DEMBB_THREADING_ANALYSIS_MODE", "-DEMBB_DEBUG"],
    );
}

#[test]
fn test_missing_backend_is_a_compile_error() {
    if !Language::C11.is_installed() {
        return;
    }
    for (variant, message) in [
        (Variant::Full, "unsupported platform"),
        (Variant::StandardOnly, "Not available for selected C or C++ standard"),
    ] {
        let dir = scratch_dir(&format!("bare-{:?}", variant));
        let config = GeneratorConfig::new("embb", variant).unwrap();
        let output = build(&dir, Language::C11, &generate_header(&config).unwrap(), BARE_CONFIG_H, &[]);
        assert!(!output.status.success(), "{:?} compiled without a backend", variant);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains(message), "{}", stderr);
        fs::remove_dir_all(dir).unwrap();
    }
}
