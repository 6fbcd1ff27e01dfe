use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Variation {
    domain: String,
    family: String,
}

const FAMILIES: [&str; 9] = [
    "transposition",
    "deletion",
    "duplication",
    "insertion",
    "substitution",
    "keyboard",
    "phonetic",
    "homoglyph",
    "brand-misspelling",
];

fn find_typoguard_binary() -> PathBuf {
    if let Ok(path) = env::var("TYPOGUARD_BIN") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return p;
        }
    }

    // Relative to this tester's directory, then to the repo root
    let candidates = [
        "../../target/release/typoguard",
        "../../target/debug/typoguard",
        "./target/release/typoguard",
        "./target/debug/typoguard",
    ];

    for cand in candidates {
        let p = PathBuf::from(cand);
        if p.is_file() {
            return p;
        }
    }

    if let Ok(paths) = env::var("PATH") {
        for dir in paths.split(':') {
            let mut p = PathBuf::from(dir);
            p.push("typoguard");
            if p.is_file() {
                return p;
            }
        }
    }

    panic!("Unable to locate typoguard binary. Set TYPOGUARD_BIN env var to the path of ./target/release/typoguard.");
}

fn run_typoguard(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(find_typoguard_binary())
        .args(args)
        .output()
        .expect("failed to execute typoguard");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

// "<domain>, <family>" per line
fn parse_output(stdout: &str) -> Vec<Variation> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once(", "))
        .map(|(domain, family)| Variation {
            domain: domain.to_string(),
            family: family.to_string(),
        })
        .collect()
}

fn list(domain: &str) -> Result<Vec<Variation>, String> {
    let (code, stdout, stderr) = run_typoguard(&["--list", domain]);
    if code != 0 {
        return Err(format!("typoguard --list {} exited with {}: {}", domain, code, stderr.trim()));
    }
    Ok(parse_output(&stdout))
}

fn assert_contains(variants: &[Variation], domain: &str, family: &str) -> Result<(), String> {
    match variants.iter().find(|v| v.domain == domain) {
        Some(v) if v.family == family => Ok(()),
        Some(v) => Err(format!("'{}' attributed to '{}', expected '{}'", domain, v.family, family)),
        None => Err(format!("Expected domain '{}' not found in output", domain)),
    }
}

fn assert_no_original(variants: &[Variation], original: &str) -> Result<(), String> {
    if variants.iter().any(|v| v.domain == original) {
        Err(format!("Original domain '{}' was included in output", original))
    } else {
        Ok(())
    }
}

// ====== Generation ======
fn test_common_typos() -> Result<(), String> {
    let variants = list("example.com")?;
    assert_no_original(&variants, "example.com")?;
    assert_contains(&variants, "exmaple.com", "transposition")?;
    assert_contains(&variants, "exampl.com", "deletion")?;
    assert_contains(&variants, "exaample.com", "duplication")?;
    assert_contains(&variants, "ex@mple.com", "homoglyph")?;
    Ok(())
}

fn test_extension_preserved() -> Result<(), String> {
    let variants = list("example.org")?;
    if variants.is_empty() {
        return Err("No variations generated".to_string());
    }
    for v in &variants {
        if !v.domain.ends_with(".org") {
            return Err(format!("Extension changed in {}", v.domain));
        }
    }
    Ok(())
}

fn test_unique_and_sorted() -> Result<(), String> {
    let variants = list("example.com")?;
    let domains: Vec<&str> = variants.iter().map(|v| v.domain.as_str()).collect();
    let unique: HashSet<&str> = domains.iter().copied().collect();
    if unique.len() != domains.len() {
        return Err(format!("{} duplicate domains in output", domains.len() - unique.len()));
    }
    let mut sorted = domains.clone();
    sorted.sort();
    if sorted != domains {
        return Err("Output is not sorted by domain".to_string());
    }
    Ok(())
}

fn test_family_labels() -> Result<(), String> {
    let variants = list("example.com")?;
    for v in &variants {
        if !FAMILIES.contains(&v.family.as_str()) {
            return Err(format!("Unexpected family label: {}", v.family));
        }
    }
    Ok(())
}

fn test_deterministic() -> Result<(), String> {
    let first = list("google.com")?;
    let second = list("google.com")?;
    if first == second {
        Ok(())
    } else {
        Err("Two runs produced different output".to_string())
    }
}

fn with_brands(json: &str, domain: &str) -> Result<Vec<Variation>, String> {
    let path = env::temp_dir().join(format!("typoguard-brands-{}-{}.json", std::process::id(), domain));
    fs::write(&path, json).map_err(|e| e.to_string())?;

    let (code, stdout, stderr) = run_typoguard(&["--list", "--brands", path.to_str().unwrap_or_default(), domain]);
    let _ = fs::remove_file(&path);

    if code != 0 {
        return Err(format!("exited with {}: {}", code, stderr.trim()));
    }
    Ok(parse_output(&stdout))
}

fn test_brands_match_exact_label() -> Result<(), String> {
    let variants = with_brands(r#"{"google": ["zzgoogle"]}"#, "example.com")?;
    if variants.iter().any(|v| v.family == "brand-misspelling") {
        Err("Brand entry for another label was applied".to_string())
    } else {
        Ok(())
    }
}

fn test_custom_brands() -> Result<(), String> {
    let variants = with_brands(r#"{"example": ["zzexample", "exxxample"]}"#, "example.com")?;
    assert_contains(&variants, "zzexample.com", "brand-misspelling")?;
    assert_contains(&variants, "exxxample.com", "brand-misspelling")
}

// ====== Failures ======
fn test_rejects_bare_label() -> Result<(), String> {
    let (code, _stdout, stderr) = run_typoguard(&["--list", "localhost"]);
    if code == 0 {
        return Err("Accepted a domain without an extension".to_string());
    }
    if !stderr.contains("[-]") {
        return Err(format!("Missing error tag in stderr: {}", stderr.trim()));
    }
    Ok(())
}

fn test_rejects_missing_brands_file() -> Result<(), String> {
    let (code, _stdout, stderr) = run_typoguard(&["--list", "--brands", "/nonexistent/brands.json", "example.com"]);
    if code == 0 {
        return Err("Accepted a missing brand dictionary".to_string());
    }
    if !stderr.contains("/nonexistent/brands.json") {
        return Err(format!("Error does not name the path: {}", stderr.trim()));
    }
    Ok(())
}

fn test_rejects_zero_concurrency() -> Result<(), String> {
    let (code, _stdout, _stderr) = run_typoguard(&["-c", "0", "example.com"]);
    if code == 0 {
        Err("Accepted --concurrency 0".to_string())
    } else {
        Ok(())
    }
}

fn main() {
    let bin = find_typoguard_binary();
    eprintln!("Using typoguard binary: {}", bin.display());

    let mut failures: Vec<String> = Vec::new();

    let tests: Vec<(&str, fn() -> Result<(), String>)> = vec![
        ("common typos", test_common_typos),
        ("extension preserved", test_extension_preserved),
        ("unique and sorted", test_unique_and_sorted),
        ("family labels", test_family_labels),
        ("deterministic", test_deterministic),
        ("brands match exact label", test_brands_match_exact_label),
        ("custom brands", test_custom_brands),
        ("rejects bare label", test_rejects_bare_label),
        ("rejects missing brands file", test_rejects_missing_brands_file),
        ("rejects zero concurrency", test_rejects_zero_concurrency),
    ];

    for (name, f) in &tests {
        match f() {
            Ok(()) => println!("[PASS] {}", name),
            Err(err) => {
                println!("[FAIL] {} -> {}", name, err);
                failures.push(format!("{}: {}", name, err));
            }
        }
    }

    if failures.is_empty() {
        println!("\nAll tests passed");
        std::process::exit(0);
    } else {
        println!("\n{} test(s) failed:", failures.len());
        for f in &failures {
            println!(" - {}", f);
        }
        std::process::exit(1);
    }
}
