//! Target platforms of the multiplatform client and the tasks the host
//! toolchain registers for each of them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Target {
    Jvm,
    IosX64,
    IosArm64,
    IosSimulatorArm64,
    AndroidNativeArm32,
    AndroidNativeArm64,
    AndroidNativeX86,
    AndroidNativeX64,
}

impl Target {
    pub const ALL: [Target; 8] = [
        Target::Jvm,
        Target::IosX64,
        Target::IosArm64,
        Target::IosSimulatorArm64,
        Target::AndroidNativeArm32,
        Target::AndroidNativeArm64,
        Target::AndroidNativeX86,
        Target::AndroidNativeX64,
    ];

    /// Platform name as it appears inside task names, e.g. `IosArm64` in
    /// `compileKotlinIosArm64`.
    pub fn name(self) -> &'static str {
        match self {
            Target::Jvm => "Jvm",
            Target::IosX64 => "IosX64",
            Target::IosArm64 => "IosArm64",
            Target::IosSimulatorArm64 => "IosSimulatorArm64",
            Target::AndroidNativeArm32 => "AndroidNativeArm32",
            Target::AndroidNativeArm64 => "AndroidNativeArm64",
            Target::AndroidNativeX86 => "AndroidNativeX86",
            Target::AndroidNativeX64 => "AndroidNativeX64",
        }
    }

    /// Target name as written in the build script, e.g. `iosArm64`.
    pub fn prefix(self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }

    pub fn is_native(self) -> bool {
        !matches!(self, Target::Jvm)
    }

    pub fn is_ios(self) -> bool {
        matches!(
            self,
            Target::IosX64 | Target::IosArm64 | Target::IosSimulatorArm64
        )
    }

    /// Parses either spelling, `iosArm64` or `IosArm64`.
    pub fn parse(name: &str) -> Option<Target> {
        Target::ALL
            .into_iter()
            .find(|target| target.name().eq_ignore_ascii_case(name))
    }

    /// Tasks the host toolchain registers for this target alone.
    pub fn host_tasks(self) -> Vec<String> {
        let name = self.name();
        let prefix = self.prefix();

        let mut tasks = vec![
            format!("compileKotlin{name}"),
            format!("compileTestKotlin{name}"),
            format!("{prefix}SourcesJar"),
            format!("generateMetadataFileFor{name}Publication"),
            format!("generatePomFileFor{name}Publication"),
            format!("sign{name}Publication"),
            format!("publish{name}PublicationToMavenLocal"),
            format!("publish{name}PublicationToCentralPortalRepository"),
            format!("{prefix}Test"),
        ];

        if self.is_native() {
            tasks.push(format!("{prefix}MainKlibrary"));
        } else {
            tasks.push(format!("{prefix}Jar"));
        }

        if self.is_ios() {
            tasks.push(format!("linkDebugFramework{name}"));
            tasks.push(format!("linkReleaseFramework{name}"));
        }

        tasks
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.prefix())
    }
}

/// Tasks registered once per project regardless of targets.
const COMMON_TASKS: &[&str] = &[
    "clean",
    "check",
    "compileKotlinMetadata",
    "compileCommonMainKotlinMetadata",
    "allMetadataJar",
    "sourcesJar",
    "generateMetadataFileForKotlinMultiplatformPublication",
    "generatePomFileForKotlinMultiplatformPublication",
    "signKotlinMultiplatformPublication",
    "publishKotlinMultiplatformPublicationToMavenLocal",
    "publishKotlinMultiplatformPublicationToCentralPortalRepository",
    "publish",
    "publishToMavenLocal",
];

/// Every task the host toolchain registers for `targets`, in a stable order.
pub fn host_tasks(targets: &[Target]) -> Vec<String> {
    let mut tasks: Vec<String> = COMMON_TASKS.iter().map(|task| task.to_string()).collect();

    for target in targets {
        tasks.extend(target.host_tasks());
    }

    if targets.iter().any(|target| target.is_ios()) {
        tasks.push("assembleXCFramework".to_string());
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(Target::Jvm.prefix(), "jvm");
        assert_eq!(Target::IosSimulatorArm64.prefix(), "iosSimulatorArm64");
        assert_eq!(Target::AndroidNativeX86.to_string(), "androidNativeX86");
    }

    #[test]
    fn test_parse_both_spellings() {
        assert_eq!(Target::parse("iosArm64"), Some(Target::IosArm64));
        assert_eq!(Target::parse("IosArm64"), Some(Target::IosArm64));
        assert_eq!(Target::parse("wasm"), None);
    }

    #[test]
    fn test_jvm_has_jar_native_has_klibrary() {
        let jvm = Target::Jvm.host_tasks();
        assert!(jvm.contains(&"jvmJar".to_string()));
        assert!(!jvm.iter().any(|t| t.ends_with("Klibrary")));

        let native = Target::AndroidNativeArm64.host_tasks();
        assert!(native.contains(&"androidNativeArm64MainKlibrary".to_string()));
        assert!(!native.iter().any(|t| t.starts_with("link")));
    }

    #[test]
    fn test_xcframework_only_with_ios() {
        assert!(!host_tasks(&[Target::Jvm]).contains(&"assembleXCFramework".to_string()));
        assert!(host_tasks(&[Target::IosX64]).contains(&"assembleXCFramework".to_string()));
    }

    #[test]
    fn test_host_tasks_are_unique() {
        let tasks = host_tasks(&Target::ALL);
        let unique: std::collections::HashSet<_> = tasks.iter().collect();
        assert_eq!(unique.len(), tasks.len());
    }
}
