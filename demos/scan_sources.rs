use deb_cachefilter::{
    parse_query, CacheFile, Config, DepCache, Matcher, PkgCache, SourceRecords,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SOURCES: &str = "\
Package: hello
Binary: hello
Version: 2.10-3
Maintainer: Santiago Vila <sanvila@debian.org>
Build-Depends: debhelper-compat (= 13), libfoo-dev:native [linux-any], help2man <!nodoc>
Build-Depends-Indep: texinfo
Build-Conflicts: autoconf2.13
Architecture: any
Format: 3.0 (quilt)
Directory: pool/main/h/hello
Files:
 bb6cb3b5b6b3ab0b1e5e2e0f9a0e9f10 1183 hello_2.10-3.dsc
 6cd0ffea3884a4e79330338dcc2987d6 725946 hello_2.10.orig.tar.gz
 f4c5a2a8b8d3e1e9c1d0e7e6b5a4c3d2 12688 hello_2.10-3.debian.tar.xz
Checksums-Sha256:
 3d4a19e8e1b2bd85e3c0d4a3b2e3f06e5c4bd8d1b6e0a38a6f9f1c2e3d4b5a69 1183 hello_2.10-3.dsc
 31e066137a962676e89f69d1b65382de95a7ef7d914b8cb956f41ea72e0f516b 725946 hello_2.10.orig.tar.gz
 8f1c3a2d4b5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f8 12688 hello_2.10-3.debian.tar.xz

Package: apt
Binary: apt, libapt-pkg6.0, apt-doc,
 apt-utils
Version: 2.6.1
Build-Depends: cmake (>= 3.4), libzstd-dev (>= 1.0) | libzstd1-dev
Checksums-Sha256:
 0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0 2612 apt_2.6.1.dsc
";

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deb_cachefilter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    println!("Native arch:  {}", config.native_arch);

    let mut cache = PkgCache::new();
    let mut depcache = DepCache::new();

    for record in SourceRecords::new(SOURCES, config) {
        let record = record.expect("failed to parse source record");
        let name = record.package().unwrap_or("<unnamed>");

        println!("\n=== {} {} ===", name, record.version().unwrap_or("?"));
        println!("Binaries:     {}", record.binaries().join(" "));

        let deps = record
            .build_depends(false, true)
            .expect("failed to parse build dependencies");
        for dep in &deps {
            let or = if dep.or_next { " |" } else { "" };
            println!("  {:<22} {}{}", dep.kind, dep, or);
        }

        let files = record.files().expect("failed to parse file list");
        for file in &files {
            println!(
                "  {:<5} {:>8}  {}  {}",
                file.file_type, file.size, file.hash.kind, file.path
            );
        }

        for binary in record.binaries() {
            let pkg = cache.add_package(&binary, "amd64");
            if let Some(version) = record.version() {
                cache.add_version(pkg, version);
            }
            if binary.ends_with("-doc") {
                depcache.mark_install(pkg);
            }
        }
    }

    let file = CacheFile::new(cache, depcache);
    for query in ["~n^lib", "?action(install)", "apt*", "~ramd64 !~ainstall"] {
        let matcher = parse_query(query, &file).expect("failed to parse query");
        let names: Vec<String> = file
            .cache()
            .packages()
            .filter(|p| matcher.matches_package(p))
            .map(|p| p.full_name())
            .collect();
        println!("\n{query:<22} -> {}", names.join(" "));
    }
}
