//! # clapp demo application
//!
//! A sample CLI showing a command tree whose configuration comes from a YAML
//! file, environment variables and flags. It exists purely to demonstrate and
//! manually verify clapp's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example clapp_demo
//! cargo run --example clapp_demo -- child --required 3
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                | How to exercise it                                                         |
//! |------------------------|----------------------------------------------------------------------------|
//! | Defaults               | `cargo run --example clapp_demo`                                           |
//! | Config file            | Create `clapp-demo.yaml` in cwd, or set `CLAPP_DEMO_CONFIG_PATH`           |
//! | Env var override       | `CLAPP_DEMO_GLOBAL=blah cargo run --example clapp_demo`                    |
//! | Flag beats env         | `CLAPP_DEMO_GLOBAL=blah cargo run --example clapp_demo -- --global-var meh`|
//! | Persistent flag        | `cargo run --example clapp_demo -- child -r 1 --global-var meh`            |
//! | Required flag          | `cargo run --example clapp_demo -- child`                                  |
//! | Flag outside config    | `cargo run --example clapp_demo -- --another-var x`                        |
//! | Logger from config     | `CLAPP_DEMO_LOG_LEVEL=0 CLAPP_DEMO_LOG_FORMAT=json cargo run --example clapp_demo` |
//! | Version via customize  | `cargo run --example clapp_demo -- --version`                              |
//! | Help without handler   | `cargo run --example clapp_demo -- info`                                   |

mod config;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clapp::{App, ClapExecutor, Command, Context, Flag, Invocation, Slot, ValueRef};

use config::DemoConfig;

fn config_path() -> Option<PathBuf> {
    std::env::var_os("CLAPP_DEMO_CONFIG_PATH").map(PathBuf::from)
}

fn print_config(ctx: &Context<'_, DemoConfig>, inv: &Invocation<'_>, another: &str) {
    let cfg = ctx.config();
    println!("Command is:         {}", inv.path.join(" "));
    println!("GlobalVar is:       {}", cfg.global);
    println!("MyConfigVar is:     {}", cfg.my_config_var);
    println!("AnotherVar is:      {another}");
    if !inv.args.is_empty() {
        println!("Args are:           {}", inv.args.join(", "));
    }
}

fn root(another: Rc<RefCell<String>>, required: Rc<RefCell<i64>>) -> Command<DemoConfig> {
    let root_another = Rc::clone(&another);

    let child = Command::<DemoConfig>::new("child")
        .short_description("I'm a child of clapp-demo")
        .long_description("Says hello and shows the values resolved for this command.")
        .local_flag(
            Flag::new("required", ValueRef::Int(Slot::Shared(Rc::clone(&required))))
                .short('r')
                .description("This int flag must be supplied.")
                .required(),
        )
        .handler(move |ctx, inv| {
            tracing::debug!("running child");
            print_config(ctx, inv, &another.borrow());
            println!("Required value is:  {}", required.borrow());
            Ok(())
        })
        .customize(|cmd| cmd.version("1.3.1"));

    Command::new("clapp-demo")
        .short_description("An example clapp command")
        .long_description(
            "This command has sub commands:\n\n\
             child:\n    shows the values used for configuration\n\n\
             info:\n    has no handler, so it prints its help",
        )
        .local_flag(
            Flag::string("my-config-var", |c: &mut DemoConfig| &mut c.my_config_var)
                .short('m')
                .description("This flag sets the MyConfigVar value."),
        )
        .local_flag(
            Flag::new("another-var", ValueRef::String(Slot::Shared(Rc::clone(&root_another))))
                .description("This flag does not change anything in config."),
        )
        .persistent_flag(
            Flag::string("global-var", |c: &mut DemoConfig| &mut c.global)
                .description("A value that can be set globally."),
        )
        .handler(move |ctx, inv| {
            tracing::info!("running root");
            print_config(ctx, inv, &root_another.borrow());
            Ok(())
        })
        .customize(|cmd| cmd.version("1.1.1"))
        .child(child)
        .child(Command::new("info").short_description("Prints its own help"))
}

fn main() -> anyhow::Result<()> {
    let another = Rc::new(RefCell::new(String::from("anothervar-default")));
    let required = Rc::new(RefCell::new(0));

    let mut config = DemoConfig::default();
    let mut app = App::new(root(another, required), &mut config);
    if let Some(path) = config_path() {
        app = app.config_path(path);
    }
    app.run(&ClapExecutor::new())?;
    Ok(())
}
