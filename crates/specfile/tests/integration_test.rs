use specfile::{Arch, CompileConfig, SpecFile};

fn compile(config: &CompileConfig) -> (String, String) {
    let source = include_str!("widget.spec");

    let mut spec = SpecFile::parse(source, config).expect("could not parse widget.spec");
    spec.resolve_ordinals().expect("could not resolve ordinals");

    let mut def = Vec::new();
    spec.write_def(&mut def, config).expect("could not write def file");

    let mut stubs = Vec::new();
    spec.write_stubs(&mut stubs, config)
        .expect("could not write stub file");

    (
        String::from_utf8(def).expect("def output should be utf-8"),
        String::from_utf8(stubs).expect("stub output should be utf-8"),
    )
}

#[test]
fn widget_def_x86() {
    let config = CompileConfig::new(Arch::X86, "widget.dll");
    let (def, _) = compile(&config);

    assert_eq!(
        def,
        "; This file is generated automatically by specc, do not edit!\n\
         \n\
         NAME widget.dll\n\
         \n\
         EXPORTS\n\
         \x20CreateWidget\n\
         \x20DestroyWidget\n\
         \x20DllInstall PRIVATE\n\
         \x20FrobInternal NONAME\n\
         \x20LegacyFrob\n\
         \x20Sleep=kernel32.SleepEx\n\
         \x20NotYetImplemented\n\
         \x20?Resize@Widget@@QAEXHH@Z=stub_function14\n\
         \x20WidgetVersion DATA\n\
         \x20ordinal2 NONAME\n"
    );
}

#[test]
fn widget_stubs_x86() {
    let config = CompileConfig::new(Arch::X86, "widget.dll");
    let (_, stubs) = compile(&config);

    assert!(stubs.starts_with(
        "/* This file is generated automatically by specc, do not edit! */\n\
         \n\
         #include <stubs.h>\n\
         \n"
    ));

    assert!(stubs.contains(
        "int __stdcall NotYetImplemented(long a0, long a1)\n\
         {\n\
         \tDbgPrint(\"WARNING: calling stub NotYetImplemented(0x%lx,0x%lx)\\n\"\
         , (long)a0, (long)a1);\n\
         \treturn 0;\n\
         }\n\n"
    ));

    assert!(stubs.contains(
        "int stub_function14()\n\
         {\n\
         \tDbgPrint(\"WARNING: calling stub ?Resize@Widget@@QAEXHH@Z()\\n\");\n\
         \t__wine_spec_unimplemented_stub(\"widget.dll\", __FUNCTION__);\n\
         \treturn 0;\n\
         }\n\n"
    ));

    // Regular exports never get stub bodies
    assert!(!stubs.contains("CreateWidget"));
}

#[test]
fn widget_def_amd64() {
    let config = CompileConfig::new(Arch::Amd64, "widget.dll");
    let (def, _) = compile(&config);

    // The i386-only export drops out, the 64-bit one appears
    assert!(!def.contains("LegacyFrob"));
    assert!(def.contains(" WideFrob\n"));
}

#[test]
fn output_is_deterministic() {
    let config = CompileConfig::new(Arch::X86, "widget.dll");
    assert_eq!(compile(&config), compile(&config));
}

#[test]
fn tracing_changes_both_outputs() {
    let mut config = CompileConfig::new(Arch::X86, "widget.dll");
    config.tracing = true;
    let (def, stubs) = compile(&config);

    // Plain stdcall exports are redirected through the relay trampoline
    assert!(def.contains(" CreateWidget=$relaytrace$CreateWidget\n"));
    // Forwarded exports keep their target instead
    assert!(def.contains(" Sleep=kernel32.SleepEx\n"));

    assert!(stubs.contains("extern int __stdcall CreateWidget(long a0, void* a1, char* a2);\n"));
    assert!(stubs.contains("int __stdcall $relaytrace$CreateWidget(long a0, void* a1, char* a2)\n"));
    assert!(stubs.contains("\tretval = CreateWidget(a0, a1, a2);\n"));
}
