use std::fs;
use std::path::{Path, PathBuf};

use super::*;
use crate::fileutil::scoped_temp_dir;

const SAMPLE_DB: &str = r#"[
  {
    "directory": "/proj/build",
    "file": "../src/main.cpp",
    "command": "g++ -I../include -isystem /opt/qt/include -DQT_CORE_LIB -DVERSION=\"1.0\" -O2 -c ../src/main.cpp -o main.o"
  },
  {
    "directory": "/proj/build",
    "file": "/proj/src/util.cpp",
    "arguments": ["g++", "-I/proj/include", "-DNDEBUG", "-std=c++17", "-c", "/proj/src/util.cpp"]
  }
]"#;

#[test]
fn parse_normalizes_records() {
    let db = CompileDb::parse(SAMPLE_DB).unwrap();
    assert_eq!(db.len(), 2);

    let info = db.info_for(Path::new("/proj/src/main.cpp")).unwrap();
    assert_eq!(info.directory, PathBuf::from("/proj/build"));
    assert_eq!(
        info.include_paths,
        vec![PathBuf::from("/proj/include"), PathBuf::from("/opt/qt/include")]
    );
    assert_eq!(info.defines, vec!["QT_CORE_LIB", "VERSION=1.0"]);
    assert_eq!(info.flags, vec!["-O2"]);
}

#[test]
fn arguments_array_is_taken_verbatim() {
    let db = CompileDb::parse(SAMPLE_DB).unwrap();
    let info = db.info_for(Path::new("/proj/src/util.cpp")).unwrap();
    assert_eq!(info.include_paths, vec![PathBuf::from("/proj/include")]);
    assert_eq!(info.defines, vec!["NDEBUG"]);
    assert_eq!(info.flags, vec!["-std=c++17"]);
}

#[test]
fn to_args_round_trips_classification() {
    let db = CompileDb::parse(SAMPLE_DB).unwrap();
    let args = db.args_for(Path::new("/proj/src/util.cpp"));
    assert!(args.contains(&"-I/proj/include".to_string()));
    assert!(args.contains(&"-DNDEBUG".to_string()));
    assert!(args.contains(&"-std=c++17".to_string()));
}

#[test]
fn unknown_file_is_file_unknown() {
    let db = CompileDb::parse(SAMPLE_DB).unwrap();
    let err = db.info_for(Path::new("/proj/src/missing.cpp")).unwrap_err();
    assert_eq!(err.error_type(), "CompileDb");
    assert!(matches!(err, crate::error::DlogcoverError::FileUnknown(_)));
}

#[test]
fn args_for_unknown_file_falls_back_to_heuristics() {
    let db = CompileDb::parse(SAMPLE_DB).unwrap();
    let args = db.args_for(Path::new("/proj/src/other.cpp"));
    assert!(args.contains(&"-std=c++17".to_string()));
}

#[test]
fn missing_database_is_db_missing() {
    let err = CompileDb::load(Path::new("/nonexistent/compile_commands.json")).unwrap_err();
    assert!(matches!(err, crate::error::DlogcoverError::DbMissing(_)));
}

#[test]
fn malformed_database_is_db_malformed() {
    let err = CompileDb::parse("{\"not\": \"an array\"}").unwrap_err();
    assert!(matches!(err, crate::error::DlogcoverError::DbMalformed(_)));
}

#[test]
fn record_without_command_or_arguments_is_skipped() {
    let db = CompileDb::parse(r#"[{"directory": "/p", "file": "a.cpp"}]"#).unwrap();
    assert!(db.is_empty());
}

#[test]
fn tokenize_honors_quoting() {
    assert_eq!(
        tokenize_command(r#"g++ -DGREETING="hello world" 'sp ace.cpp'"#),
        vec!["g++", "-DGREETING=hello world", "sp ace.cpp"]
    );
    assert_eq!(
        tokenize_command(r"g++ -DPATH=\  a.cpp"),
        vec!["g++", "-DPATH= ", "a.cpp"]
    );
    assert_eq!(tokenize_command("   "), Vec::<String>::new());
}

#[test]
fn separated_include_and_define_forms() {
    let db = CompileDb::parse(
        r#"[{
          "directory": "/p",
          "file": "a.cpp",
          "command": "cc -I /p/inc -D FOO -c a.cpp"
        }]"#,
    )
    .unwrap();
    let info = db.info_for(Path::new("/p/a.cpp")).unwrap();
    assert_eq!(info.include_paths, vec![PathBuf::from("/p/inc")]);
    assert_eq!(info.defines, vec!["FOO"]);
}

#[test]
fn parse_search_list_extracts_block() {
    let output = "\
ignoring nonexistent directory \"/x\"\n\
#include \"...\" search starts here:\n\
#include <...> search starts here:\n\
 /usr/lib/gcc/include\n\
 /usr/local/include\n\
 /usr/include\n\
End of search list.\n\
trailing noise\n";
    let includes = parse_search_list(output);
    assert_eq!(
        includes,
        vec![
            PathBuf::from("/usr/lib/gcc/include"),
            PathBuf::from("/usr/local/include"),
            PathBuf::from("/usr/include"),
        ]
    );
}

#[test]
fn parse_search_list_without_markers_is_empty() {
    assert!(parse_search_list("no compiler output here").is_empty());
}

#[test]
fn project_includes_walks_to_root_marker() {
    let dir = scoped_temp_dir("compiledb_test").unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("include")).unwrap();
    fs::create_dir_all(root.join("src/core")).unwrap();
    fs::write(root.join("CMakeLists.txt"), "project(x)").unwrap();
    let file = root.join("src/core/deep.cpp");
    fs::write(&file, "int x;").unwrap();

    let includes = project_includes(&file);
    assert!(includes.contains(&root.join("include")));
    assert!(includes.contains(&root.join("src")));
}
