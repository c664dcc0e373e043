use clap::Parser;

pub mod args;
pub mod handlers;

/// The full help text, written against semantic markers that are swapped for
/// ANSI styles at runtime.
const HELP_TEMPLATE: &str = "\
<title>vckube</title> <dim>- drive a local CoreOS Kubernetes cluster from one terminal</dim>

<group>Usage:</group> <cmd>vckube [COMMAND] [ARGS]...</cmd>

<group>Cluster lifecycle:</group>
  <cmd>up</cmd>                Boot the cluster and refresh the membership cache
  <cmd>halt</cmd>              Power every machine down
  <cmd>reload</cmd>            Restart the machines with the current Vagrantfile
  <cmd>reset</cmd>             Push fresh cloud-config to each member and reboot it
  <cmd>reboot</cmd>            'sudo reboot' across the cluster
  <err>destroy</err>           Delete the machines and forget the cluster state

<group>Inspection:</group>
  <cmd>status</cmd> <dim>(st)</dim>       Liveness, OS version and unit summary per member
  <cmd>ssh</cmd>               Open a shell on one member, or on each in turn
  <cmd>sshcmd</cmd> <dim>(cmd)</dim>      Run a command on one, several, or all members
  <cmd>kubectl</cmd> <dim>(k)</dim>       Run kubectl against the cluster API server

<group>Provisioning:</group>
  <cmd>ansible</cmd>           Run an Ansible playbook against the inventory
  <cmd>inventory</cmd> <dim>(hosts)</dim> Rewrite the Ansible inventory for this host
  <cmd>cache</cmd>             Inspect or clear the membership cache

<dim>Run 'vckube [COMMAND] --help' for the flags a command takes.</dim>
";

/// Builds the color-aware help string at runtime.
fn build_help_string() -> &'static str {
    // Mini-renderer for the semantic help template above: each marker pair
    // becomes an ANSI style, or nothing when colors are off.
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan (for commands)
    let group = if use_colors { "\x1b[1;32m" } else { "" }; // Bold Green
    let err = if use_colors { "\x1b[91m" } else { "" }; // Bright Red (destructive)
    let dim = if use_colors { "\x1b[2m" } else { "" }; // Dim
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let formatted_string = HELP_TEMPLATE
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<group>", group)
        .replace("</group>", reset)
        .replace("<err>", err)
        .replace("</err>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(formatted_string.into_boxed_str())
}

/// vckube: vagrant, ssh, ansible and kubectl glue for a local CoreOS cluster.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command to run. Each command parses its own arguments.
    pub command: Option<String>,

    /// Everything after the command, handed to its handler untouched.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
