/// Compression suffixes recognised when guessing the type of a source file.
pub const DEFAULT_COMPRESSOR_EXTENSIONS: &[&str] = &[".xz", ".bz2", ".lzma", ".gz", ".lz4", ".zst"];

/// Settings consulted by the source record extractors.
///
/// The matcher layer itself is configuration-free; only build-dependency
/// restriction evaluation and file-type inference read these values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host architecture, used to evaluate `[arch]` restrictions and to
    /// strip `:native`/`:<arch>` multi-arch qualifiers.
    pub native_arch: String,
    /// Active build profiles, used to evaluate `<profile>` restrictions.
    pub build_profiles: Vec<String>,
    /// Known compressor suffixes, each with its leading dot.
    pub compressor_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            native_arch: target_arch().to_string(),
            build_profiles: Vec::new(),
            compressor_extensions: DEFAULT_COMPRESSOR_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// `DEB_HOST_ARCH` overrides the native architecture and
    /// `DEB_BUILD_PROFILES` (whitespace separated) sets the active profiles.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::Config;
    ///
    /// let config = Config::from_lookup(|key| match key {
    ///     "DEB_HOST_ARCH" => Some("arm64".to_string()),
    ///     "DEB_BUILD_PROFILES" => Some("nocheck nodoc".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.native_arch, "arm64");
    /// assert_eq!(config.build_profiles, vec!["nocheck", "nodoc"]);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(arch) = lookup("DEB_HOST_ARCH").filter(|a| !a.trim().is_empty()) {
            config.native_arch = arch.trim().to_string();
        }
        if let Some(profiles) = lookup("DEB_BUILD_PROFILES") {
            config.build_profiles = profiles.split_whitespace().map(|s| s.to_string()).collect();
        }
        config
    }

    /// Replace the native architecture.
    pub fn with_native_arch(mut self, arch: impl Into<String>) -> Self {
        self.native_arch = arch.into();
        self
    }

    /// Replace the active build profiles.
    pub fn with_build_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the known compressor suffixes.
    pub fn with_compressor_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compressor_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `ext` (without its leading dot) names a known compressor.
    pub fn is_compressor_extension(&self, ext: &str) -> bool {
        self.compressor_extensions
            .iter()
            .any(|known| known.strip_prefix('.') == Some(ext))
    }

    /// Whether `profile` is among the active build profiles.
    pub fn has_build_profile(&self, profile: &str) -> bool {
        self.build_profiles.iter().any(|p| p == profile)
    }
}

/// Debian architecture name of the compile target.
fn target_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64el",
        "powerpc64" => "ppc64",
        "powerpc" => "powerpc",
        "riscv64" => "riscv64",
        "s390x" => "s390x",
        "loongarch64" => "loong64",
        "mips64" if cfg!(target_endian = "little") => "mips64el",
        "sparc64" => "sparc64",
        other => other,
    }
}
