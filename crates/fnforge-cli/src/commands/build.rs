use fnforge_build::{BuildOutput, BuildRequest, DockerBuilder, ImageBuilder, Orchestrator};
use fnforge_core::{
    BuildArgMap, BuildSettings, FnforgeConfig, FunctionSpec, Stack, TemplateStore,
    validate_language,
};
use fnforge_template::{Provisioned, TemplateProvisioner};
use std::path::Path;
use std::sync::Arc;

pub const BUILD_EXAMPLES: &str = "\
Examples:
  fnforge build -f https://domain/path/myfunctions.yml
  fnforge build -f ./stack.yml --no-cache --build-arg NPM_VERSION=0.2.2
  fnforge build -f ./stack.yml --lang python3 --build-option dev
  fnforge build -f ./stack.yml --filter \"*gif*\"
  fnforge build -f ./stack.yml --regex \"fn[0-9]_.*\"
  fnforge build --image=my_image --lang=python --handler=/path/to/fn/ --name=my_fn --squash";

#[derive(clap::Args)]
pub struct BuildArgs {
    /// Stack manifest file or URL
    #[arg(long = "yaml", short = 'f')]
    yaml: Option<String>,
    /// Only build functions whose name matches this regex
    #[arg(long)]
    regex: Option<String>,
    /// Only build functions whose name matches this wildcard
    #[arg(long)]
    filter: Option<String>,
    /// Docker image name to build
    #[arg(long)]
    image: Option<String>,
    /// Directory with the function's handler
    #[arg(long)]
    handler: Option<String>,
    /// Name of the function
    #[arg(long)]
    name: Option<String>,
    /// Language template (also selects --build-option sets)
    #[arg(long, default_value = "")]
    lang: String,
    /// Do not use Docker's build cache
    #[arg(long)]
    no_cache: bool,
    /// Use Docker's squash flag for smaller images [experimental]
    #[arg(long)]
    squash: bool,
    /// Only write build contexts to ./build/, do not run docker
    #[arg(long)]
    shrinkwrap: bool,
    /// Build in parallel to the given depth (values below 1 mean 1)
    #[arg(long, allow_negative_numbers = true)]
    parallel: Option<i64>,
    /// Add a build-arg for Docker (KEY=VALUE)
    #[arg(long = "build-arg", short = 'b', value_name = "KEY=VALUE")]
    build_arg: Vec<String>,
    /// Set a build option from the --lang template, e.g. dev
    #[arg(long = "build-option", short = 'o', value_name = "NAME")]
    build_option: Vec<String>,
    /// Fail before building when any function's build options do not resolve
    #[arg(long)]
    strict: bool,
    /// Template archive fetched when the template directory is missing
    #[arg(long)]
    template_url: Option<String>,
}

/// Build every function in the manifest, or a single function from flags.
pub async fn build(args: BuildArgs) -> anyhow::Result<()> {
    let config = FnforgeConfig::load(Path::new("."))?;
    let language = validate_language(&args.lang);

    let mut build_args = BuildArgMap::from_entries(&args.build_arg)?;

    if args.yaml.is_none() {
        require_single_function_flags(&args)?;
    }
    if !args.build_option.is_empty() && language.is_empty() {
        anyhow::bail!("--build-option needs --lang to select the template that defines it");
    }

    let stack = match &args.yaml {
        Some(location) => Some(
            load_stack(location)
                .await?
                .filter(args.regex.as_deref(), args.filter.as_deref())?,
        ),
        None => None,
    };

    let template_url = args
        .template_url
        .clone()
        .unwrap_or_else(|| config.templates.url.clone());
    let provisioner = TemplateProvisioner::from_config(&config.templates);
    if let Provisioned::Fetched(summary) = provisioner.ensure_templates(&template_url).await? {
        println!(
            "Fetched {} template file(s) into {}",
            summary.written,
            provisioner.dir().display()
        );
    }

    let templates = TemplateStore::new(config.templates.dir.clone());
    if !args.build_option.is_empty() {
        let tokens = templates.validate_build_options(&args.build_option, &language)?;
        build_args.extend(&tokens)?;
    }

    let settings = BuildSettings {
        parallel: args.parallel.unwrap_or(config.build.parallel),
        no_cache: args.no_cache,
        squash: args.squash,
        shrinkwrap: args.shrinkwrap,
        strict_options: args.strict || config.build.strict_options,
    };
    let builder = DockerBuilder::new(templates.clone());

    match stack {
        Some(stack) if !stack.functions.is_empty() => {
            build_stack(stack, builder, settings, templates, build_args).await
        }
        _ => {
            require_single_function_flags(&args)?;
            build_single(&args, language, builder, settings, build_args).await
        }
    }
}

async fn build_stack(
    stack: Stack,
    builder: DockerBuilder,
    settings: BuildSettings,
    templates: TemplateStore,
    build_args: BuildArgMap,
) -> anyhow::Result<()> {
    tracing::info!(
        provider = %stack.provider.name,
        functions = stack.functions.len(),
        "building stack"
    );
    let orchestrator = Orchestrator::new(builder, settings, templates, build_args);
    let report =
        tokio::task::spawn_blocking(move || orchestrator.run(&stack.functions)).await??;

    for name in &report.skipped {
        println!("Skipping build of: {name}.");
    }
    for built in &report.built {
        println!("{}", describe(&built.name, &built.output));
    }
    println!();
    print!("{report}");

    if !report.is_success() {
        anyhow::bail!("{} function build(s) failed", report.failed.len());
    }
    Ok(())
}

async fn build_single(
    args: &BuildArgs,
    language: String,
    builder: DockerBuilder,
    settings: BuildSettings,
    build_args: BuildArgMap,
) -> anyhow::Result<()> {
    let spec = FunctionSpec {
        name: args.name.clone().unwrap_or_default(),
        image: args.image.clone().unwrap_or_default(),
        handler: args.handler.clone().unwrap_or_default(),
        language,
        ..Default::default()
    };
    let request = BuildRequest::for_function(&spec, &settings, Arc::new(build_args));

    let output = tokio::task::spawn_blocking(move || builder.build(&request)).await??;
    println!("{}", describe(&spec.name, &output));
    Ok(())
}

/// Without a manifest, image, handler and name must all be given.
fn require_single_function_flags(args: &BuildArgs) -> anyhow::Result<()> {
    if args.image.as_deref().is_none_or(str::is_empty) {
        anyhow::bail!("please provide a valid --image name for your Docker image");
    }
    if args.handler.as_deref().is_none_or(str::is_empty) {
        anyhow::bail!("please provide the full path to your function's handler");
    }
    if args.name.as_deref().is_none_or(str::is_empty) {
        anyhow::bail!("please provide the deployed --name of your function");
    }
    Ok(())
}

/// Read a manifest from a local path or an http(s) URL.
async fn load_stack(location: &str) -> anyhow::Result<Stack> {
    if location.starts_with("http://") || location.starts_with("https://") {
        tracing::debug!(url = location, "fetching remote stack manifest");
        let content = reqwest::get(location)
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(Stack::parse(&content, location)?)
    } else {
        Ok(Stack::load(Path::new(location))?)
    }
}

fn describe(name: &str, output: &BuildOutput) -> String {
    match output {
        BuildOutput::Image { image } => format!("Image: {image} built ({name})."),
        BuildOutput::Shrinkwrapped { context } => {
            format!("{name} shrink-wrapped to {}", context.display())
        }
    }
}
