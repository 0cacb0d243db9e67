//! Whole-pipeline tests (§8): each program is compiled straight through
//! preprocessing, lexing, parsing, IR generation, register allocation, code
//! emission and native assembly, then actually executed, with its process
//! exit code checked against the value the C source computes. Mirrors the
//! grounding pack's style of a handful of top-level `tests/*.rs` files with
//! small helper functions rather than one test per assertion
//! (`examples/FuelLabs-fuel-vm/fuel-vm/tests/alu.rs`).

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use subc::driver::cli::Args;
use subc::driver::session::CompileSession;

/// Every call gets its own path so parallel test threads never collide.
fn unique_path(stem: &str, ext: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("subc-e2e-{stem}-{}-{n}.{ext}", std::process::id()))
}

/// Compiles `source`, runs the resulting binary and asserts its exit code.
fn assert_exit_code(stem: &str, source: &str, expected: i32) {
    let src_path = unique_path(stem, "c");
    std::fs::write(&src_path, source).expect("writing test source");
    let out_path = unique_path(stem, "out");

    let args = Args {
        source: src_path.clone(),
        output: out_path.clone(),
        run: false,
        verbose: false,
        emit_asm: false,
        linear_scan: false,
    };

    let session = CompileSession::new(&src_path, false);
    session.compile(&args).expect("compilation should succeed");

    let status = Command::new(&out_path).status().expect("running compiled binary");
    assert_eq!(
        status.code(),
        Some(expected),
        "unexpected exit code for {stem}"
    );

    let _ = std::fs::remove_file(&src_path);
    let _ = std::fs::remove_file(&out_path);
}

#[test]
fn returns_a_constant() {
    assert_exit_code("const", "int main() { return 42; }", 42);
}

#[test]
fn recursive_factorial() {
    assert_exit_code(
        "factorial",
        r#"
        int fact(int n) {
            if (n <= 1) return 1;
            return n * fact(n - 1);
        }
        int main() { return fact(5); }
        "#,
        120,
    );
}

#[test]
fn global_array_indexing() {
    assert_exit_code(
        "array",
        r#"
        int a[5] = {1, 2, 3, 4, 5};
        int main() { return a[0] + a[4]; }
        "#,
        6,
    );
}

#[test]
fn small_struct_return_via_rax() {
    assert_exit_code(
        "small-struct",
        r#"
        typedef struct { int x; int y; } P;
        P mk() { P p = {3, 4}; return p; }
        int main() { P p = mk(); return p.x + p.y; }
        "#,
        7,
    );
}

#[test]
fn large_struct_return_via_rax_rdx_pair() {
    assert_exit_code(
        "large-struct",
        r#"
        typedef struct { int id; int *locs; } S;
        S ld() {
            static int L[1] = {99};
            S s = {5, L};
            return s;
        }
        int main() {
            S s = ld();
            return s.id + *s.locs - 99;
        }
        "#,
        5,
    );
}

/// `g(x, y)` where the allocator happens to place `x` in `%rsi` and `y` in
/// `%rdi` (the classic register-swap cycle, §4.3/§4.4) has to come out of
/// `emit_call`'s argument-populating moves correctly rather than clobbering
/// one argument with the other's value before it's read.
#[test]
fn two_register_argument_call_survives_a_register_swap() {
    assert_exit_code(
        "swap-args",
        r#"
        int sub(int a, int b) { return a - b; }
        int g(int x, int y) { return sub(y, x); }
        int main() { return g(3, 10); }
        "#,
        7,
    );
}

#[test]
fn for_loop_accumulation() {
    assert_exit_code(
        "for-loop",
        r#"
        int main() {
            int x = 0;
            for (int i = 0; i < 10; i++) x += i;
            return x;
        }
        "#,
        45,
    );
}

/// Compiling the same source twice in this process must produce
/// byte-identical output (§8). This alone can't catch an allocator
/// worklist that breaks ties by `HashSet` iteration order, since both
/// compiles here share this process's `RandomState` hasher seed — see
/// `compilation_is_deterministic_across_processes` below for that.
#[test]
fn compilation_is_deterministic_within_a_process() {
    let source = r#"
        int fib(int n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        int main() { return fib(10); }
    "#;

    let src_path = unique_path("determinism", "c");
    std::fs::write(&src_path, source).expect("writing test source");

    let out_a = unique_path("determinism-a", "out");
    let out_b = unique_path("determinism-b", "out");

    for out_path in [&out_a, &out_b] {
        let args = Args {
            source: src_path.clone(),
            output: out_path.clone(),
            run: false,
            verbose: false,
            emit_asm: false,
            linear_scan: false,
        };
        CompileSession::new(&src_path, false)
            .compile(&args)
            .expect("compilation should succeed");
    }

    let bytes_a = std::fs::read(&out_a).expect("reading first binary");
    let bytes_b = std::fs::read(&out_b).expect("reading second binary");
    assert_eq!(bytes_a, bytes_b);

    let _ = std::fs::remove_file(&src_path);
    let _ = std::fs::remove_file(&out_a);
    let _ = std::fs::remove_file(&out_b);
}

/// The real determinism invariant (§8) spans process boundaries: two
/// separate invocations of the `subc` binary compiling the same source must
/// still produce byte-identical output, even though each process's
/// `HashSet`/`HashMap` iteration order is seeded independently. Spawns the
/// compiled binary itself rather than calling `CompileSession` in-process,
/// so each compile genuinely runs under its own hasher seed.
#[test]
fn compilation_is_deterministic_across_processes() {
    let source = r#"
        struct Node { int value; int next; };
        int sum_chain(struct Node a, struct Node b, struct Node c) {
            return a.value + b.value + c.value + a.next + b.next + c.next;
        }
        int main() {
            struct Node a = {1, 2};
            struct Node b = {3, 4};
            struct Node c = {5, 6};
            return sum_chain(a, b, c);
        }
    "#;

    let src_path = unique_path("determinism-xproc", "c");
    std::fs::write(&src_path, source).expect("writing test source");

    let out_a = unique_path("determinism-xproc-a", "out");
    let out_b = unique_path("determinism-xproc-b", "out");

    for out_path in [&out_a, &out_b] {
        let status = Command::new(env!("CARGO_BIN_EXE_subc"))
            .arg(&src_path)
            .arg("-o")
            .arg(out_path)
            .status()
            .expect("spawning subc");
        assert!(status.success(), "subc invocation failed");
    }

    let bytes_a = std::fs::read(&out_a).expect("reading first binary");
    let bytes_b = std::fs::read(&out_b).expect("reading second binary");
    assert_eq!(
        bytes_a, bytes_b,
        "two separate subc processes produced different output for the same source"
    );

    let _ = std::fs::remove_file(&src_path);
    let _ = std::fs::remove_file(&out_a);
    let _ = std::fs::remove_file(&out_b);
}
