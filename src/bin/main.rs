use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use dwarf1cpp::{Dwarf, ElfFile, Error, Files, PrintOptions, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_usage(opts: &getopts::Options) -> ! {
    let program = env::args().next().unwrap_or_else(|| String::from("dwarf1cpp"));
    let brief = format!("Usage: {} [options] <input ELF file> <output directory>", program);
    write!(&mut io::stderr(), "{}", opts.usage(&brief)).ok();
    process::exit(1);
}

fn run(input: &Path, output: &Path, options: PrintOptions) -> Result<()> {
    info!("loading ELF file {}", input.display());
    let file = fs::File::open(input)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::EmptyFile);
    }
    let map = unsafe { memmap::Mmap::map(&file)? };
    let elf = ElfFile::parse(&map)?;

    info!("loading DWARF v1 information");
    let dwarf = Dwarf::load(&elf)?;

    info!("converting DWARF v1 entries to C++");
    let files = Files::from(&dwarf);

    for cpp in &files {
        let path = output.join(cpp.output_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!("writing {}", path.display());
        fs::write(&path, cpp.display(options).to_string())?;
    }

    info!("done");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut opts = getopts::Options::new();
    opts.optflag("c", "comments", "annotate sizes, offsets and linkage in comments");
    opts.optflag("t", "types-only", "only print user-defined types");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(env::args().skip(1)) {
        Ok(m) => m,
        Err(e) => {
            writeln!(&mut io::stderr(), "{}\n", e).ok();
            print_usage(&opts);
        }
    };
    if matches.opt_present("h") || matches.free.len() != 2 {
        print_usage(&opts);
    }

    let options = PrintOptions {
        comments: matches.opt_present("c"),
        types_only: matches.opt_present("t"),
    };

    if let Err(err) = run(Path::new(&matches.free[0]), Path::new(&matches.free[1]), options) {
        error!("{}", err);
        process::exit(1);
    }
}
