use clap::Parser;

mod entities;
use entities::mac::{MacParser, bytes_from_hexstr};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "WiMAX Raw PDU Decoder",
    long_about = "Decodes a hex string as a burst of MAC PDUs or as a single management message"
)]
struct Args {
    /// What the input holds
    #[arg(help = "Input kind: [ burst | mgmt ]")]
    kind: String,

    /// Raw bytes to decode
    #[arg(help = "Hex string, whitespace and ':' separators are ignored")]
    hexstring: String,

    #[arg(
        short = 'b',
        long = "basic-cid-count",
        default_value_t = 0x5500,
        help = "Size of the basic CID range, used to classify connections"
    )]
    basic_cid_count: u16,
}

fn main() {
    eprintln!("[+] WiMAX PDU Decoding tool");

    let args = Args::parse();

    let data = match bytes_from_hexstr(&args.hexstring) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if args.basic_cid_count == 0 || args.basic_cid_count as u32 * 2 >= 0xFEFE {
        eprintln!("Error: basic CID count {} out of range", args.basic_cid_count);
        std::process::exit(1);
    }

    match args.kind.to_lowercase().as_str() {
        "burst" => MacParser::new(args.basic_cid_count).parse_burst(data),
        "mgmt" => MacParser::parse_mgmt(&data),
        _ => {
            eprintln!("Error: Unsupported input kind '{}'. Use: burst, mgmt", args.kind);
            std::process::exit(1);
        }
    }
}
